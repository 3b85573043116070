use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::model::ResourceId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hall {
    pub id: ResourceId,
    pub name: String,
    pub capacity: u32,
}

impl Hall {
    pub fn new(id: impl Into<ResourceId>, name: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capacity,
        }
    }
}

/// Lookup of bookable halls. Owned by the facility layer; the engine only reads it.
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    async fn hall(&self, id: &ResourceId) -> Option<Hall>;

    /// All halls, in a stable order.
    async fn halls(&self) -> Vec<Hall>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("malformed hall entry {0:?}: expected id=capacity[:name]")]
    Malformed(String),
    #[error("invalid capacity in hall entry {0:?}")]
    InvalidCapacity(String),
    #[error("duplicate hall id {0}")]
    Duplicate(ResourceId),
}

/// Fixed in-memory hall list.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    halls: BTreeMap<ResourceId, Hall>,
}

impl StaticCatalog {
    pub fn new(halls: impl IntoIterator<Item = Hall>) -> Self {
        Self {
            halls: halls.into_iter().map(|h| (h.id.clone(), h)).collect(),
        }
    }

    /// Parse `id=capacity[:name]` entries separated by commas.
    pub fn parse(list: &str) -> Result<Self, CatalogError> {
        let mut halls = BTreeMap::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (id, rest) = entry
                .split_once('=')
                .ok_or_else(|| CatalogError::Malformed(entry.to_string()))?;
            let id = id.trim();
            if id.is_empty() {
                return Err(CatalogError::Malformed(entry.to_string()));
            }
            let (capacity, name) = match rest.split_once(':') {
                Some((cap, name)) => (cap, name.trim()),
                None => (rest, id),
            };
            let capacity: u32 = capacity
                .trim()
                .parse()
                .map_err(|_| CatalogError::InvalidCapacity(entry.to_string()))?;
            let hall = Hall::new(id, name, capacity);
            if halls.insert(hall.id.clone(), hall).is_some() {
                return Err(CatalogError::Duplicate(ResourceId::new(id)));
            }
        }
        Ok(Self { halls })
    }

    pub fn len(&self) -> usize {
        self.halls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.halls.is_empty()
    }
}

#[async_trait]
impl ResourceCatalog for StaticCatalog {
    async fn hall(&self, id: &ResourceId) -> Option<Hall> {
        self.halls.get(id).cloned()
    }

    async fn halls(&self) -> Vec<Hall> {
        self.halls.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parse_entries() {
        let catalog = StaticCatalog::parse("aud=400:Main Auditorium, sem-a=60").unwrap();
        assert_eq!(catalog.len(), 2);
        let aud = catalog.hall(&ResourceId::new("aud")).await.unwrap();
        assert_eq!(aud.name, "Main Auditorium");
        assert_eq!(aud.capacity, 400);
        let sem = catalog.hall(&ResourceId::new("sem-a")).await.unwrap();
        assert_eq!(sem.name, "sem-a");
        let ids: Vec<String> = catalog
            .halls()
            .await
            .into_iter()
            .map(|h| h.id.to_string())
            .collect();
        assert_eq!(ids, vec!["aud", "sem-a"]);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            StaticCatalog::parse("aud").unwrap_err(),
            CatalogError::Malformed("aud".into())
        );
        assert!(matches!(
            StaticCatalog::parse("aud=lots").unwrap_err(),
            CatalogError::InvalidCapacity(_)
        ));
        assert!(matches!(
            StaticCatalog::parse("aud=1,aud=2").unwrap_err(),
            CatalogError::Duplicate(_)
        ));
        assert!(StaticCatalog::parse("").unwrap().is_empty());
    }
}
