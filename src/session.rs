use crate::batch::{BatchNumberSource, BatchRegistry};
use crate::entry::{LabelEntry, LineItem, expand_line_item};
use crate::error::LabelSheetError;

/// Line items collected for one print run, with their batch table.
#[derive(Debug, Clone, Default)]
pub struct LabelSession {
    registry: BatchRegistry,
    items: Vec<LineItem>,
}

impl LabelSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: BatchRegistry) -> Self {
        Self {
            registry,
            items: Vec::new(),
        }
    }

    /// Validates and stores an item. Items arriving without a batch number
    /// get the one already used for the same product name, or a fresh draw.
    /// Items without a name only ever print as blank cells and get none.
    pub fn submit(
        &mut self,
        mut item: LineItem,
        source: &mut dyn BatchNumberSource,
    ) -> Result<&LineItem, LabelSheetError> {
        item.validate()?;
        if item.name.trim().is_empty() {
            self.items.push(item);
            return Ok(&self.items[self.items.len() - 1]);
        }
        let preassigned = item
            .batch_number
            .as_deref()
            .map(str::trim)
            .filter(|batch| !batch.is_empty())
            .map(str::to_string);
        match preassigned {
            Some(batch) => {
                if self.registry.get(&item.name).is_none() {
                    self.registry.insert(&item.name, batch.clone());
                }
                item.batch_number = Some(batch);
            }
            None => {
                item.batch_number = Some(self.registry.assign(&item.name, source));
            }
        }
        self.items.push(item);
        Ok(&self.items[self.items.len() - 1])
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn registry(&self) -> &BatchRegistry {
        &self.registry
    }

    pub fn label_count(&self) -> usize {
        self.items.iter().map(LineItem::copies).sum()
    }

    /// Expands every item, in submission order.
    pub fn entries(&self) -> Result<Vec<LabelEntry>, LabelSheetError> {
        let mut out = Vec::with_capacity(self.label_count());
        for item in &self.items {
            out.extend(expand_line_item(item)?);
        }
        Ok(out)
    }

    /// Drops the collected items; batch numbers stay assigned.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn into_registry(self) -> BatchRegistry {
        self.registry
    }
}
