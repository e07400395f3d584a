use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sorted-class label encoder: code = position in `classes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(|v| v.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn transform(&self, value: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }

    pub fn inverse(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// class -> code, comparable with a schema's categorical encoding
    pub fn codes(&self) -> BTreeMap<String, i64> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i as i64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_sorts_and_dedups() {
        let enc = LabelEncoder::fit(["sunny", "rainy", "cloudy", "rainy"]);
        assert_eq!(enc.classes, vec!["cloudy", "rainy", "sunny"]);
        assert_eq!(enc.transform("rainy"), Some(1));
        assert_eq!(enc.transform("snowy"), None);
        assert_eq!(enc.inverse(2), Some("sunny"));
        assert_eq!(enc.codes()["cloudy"], 0);
    }
}
