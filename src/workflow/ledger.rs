//! Ledger of remote objects created this session.
//!
//! Names are kept in creation order and only once each: creating an
//! existing name again overwrites the same remote object, so one delete is
//! enough to remove it.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    names: Vec<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `name`. Returns false if it was already tracked.
    pub fn record(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Remove and return every name, leaving the ledger empty.
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.names)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_creation_order_without_duplicates() {
        let mut l = Ledger::new();
        assert!(l.record("uploaded_document"));
        assert!(l.record("document_summary"));
        assert!(!l.record("uploaded_document"));
        assert_eq!(l.names(), ["uploaded_document", "document_summary"]);
    }

    #[test]
    fn take_empties() {
        let mut l = Ledger::new();
        l.record("a");
        assert_eq!(l.take(), vec!["a".to_string()]);
        assert!(l.is_empty());
        assert_eq!(l.len(), 0);
    }
}
