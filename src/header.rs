// Copyright 2020-2022 The NATS Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    collections::HashSet,
    iter::FromIterator,
    slice,
};

/// A multi-map from header name to the values of that header.
///
/// Unlike the wire-level map used by the client, names are kept in the
/// order they were first inserted and each name keeps its values in the
/// order they were appended, which is the order they are displayed in.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, Vec<String>)>,
}

impl<K, V> FromIterator<(K, V)> for HeaderMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut headers = HeaderMap::new();
        for (k, v) in iter {
            headers.append(k, v);
        }
        headers
    }
}

impl From<&nats::HeaderMap> for HeaderMap {
    /// The client stores values in hash sets, so there is no declared order
    /// left to preserve. Names and values are sorted to keep output stable.
    fn from(headers: &nats::HeaderMap) -> Self {
        let mut entries: Vec<(String, Vec<String>)> = headers
            .iter()
            .map(|(name, values): (&String, &HashSet<String>)| {
                let mut values: Vec<String> = values.iter().cloned().collect();
                values.sort();
                (name.clone(), values)
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        HeaderMap { entries }
    }
}

impl HeaderMap {
    /// Create an empty `HeaderMap`.
    pub fn new() -> HeaderMap {
        HeaderMap::default()
    }

    /// Whether no header has been set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add `value` after any existing values of `key`.
    pub fn append<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        match self.position(&key) {
            Some(idx) => self.entries[idx].1.push(value.into()),
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    /// Iterate over header names and their values.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(name, _)| name == key)
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Iterator over the entries of a [`HeaderMap`].
#[derive(Debug)]
pub struct Iter<'a> {
    inner: slice::Iter<'a, (String, Vec<String>)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a [String]);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}
