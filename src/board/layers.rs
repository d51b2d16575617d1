//! Layer stack: physical layers, layer groups and pad sides
//!
//! Copper layers are tied into groups; every layer of a group is electrically
//! the same plane as far as connectivity is concerned. Pads are not on a
//! physical layer but on one of two pseudo-groups, the top and bottom groups.

use super::types::Side;
use crate::error::BoardError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Copper,
    Silk,
}

/// One physical layer of the stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
    /// Layer group, copper layers only
    #[serde(default)]
    pub group: Option<usize>,
    /// Board side, silk layers only
    #[serde(default)]
    pub side: Option<Side>,
    /// Excluded from design rule checking
    #[serde(default)]
    pub no_drc: bool,
}

impl Layer {
    pub fn copper(name: impl Into<String>, group: usize) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Copper,
            group: Some(group),
            side: None,
            no_drc: false,
        }
    }

    pub fn silk(name: impl Into<String>, side: Side) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Silk,
            group: None,
            side: Some(side),
            no_drc: false,
        }
    }

    pub fn without_drc(mut self) -> Self {
        self.no_drc = true;
        self
    }

    pub fn is_copper(&self) -> bool {
        self.kind == LayerKind::Copper
    }
}

/// Serialized form of the stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerStackSpec {
    pub layers: Vec<Layer>,
    pub groups: Vec<String>,
    pub top_group: usize,
    pub bottom_group: usize,
}

/// Layer stack with derived group membership
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "LayerStackSpec", into = "LayerStackSpec")]
pub struct LayerStack {
    layers: Vec<Layer>,
    group_names: Vec<String>,
    group_layers: Vec<Vec<usize>>,
    top_group: usize,
    bottom_group: usize,
    by_name: IndexMap<String, usize>,
}

impl LayerStack {
    pub fn new(
        layers: Vec<Layer>,
        groups: Vec<String>,
        top_group: usize,
        bottom_group: usize,
    ) -> Result<Self, BoardError> {
        let group_count = groups.len();
        for group in [top_group, bottom_group] {
            if group >= group_count {
                return Err(BoardError::BadGroup { group, count: group_count });
            }
        }

        let mut group_layers = vec![Vec::new(); group_count];
        let mut by_name = IndexMap::with_capacity(layers.len());
        for (index, layer) in layers.iter().enumerate() {
            if by_name.insert(layer.name.clone(), index).is_some() {
                return Err(BoardError::DuplicateLayer(layer.name.clone()));
            }
            if !layer.is_copper() {
                continue;
            }
            let group = layer
                .group
                .ok_or_else(|| BoardError::UngroupedCopper(layer.name.clone()))?;
            let members = group_layers
                .get_mut(group)
                .ok_or(BoardError::BadGroup { group, count: group_count })?;
            members.push(index);
        }

        Ok(Self {
            layers,
            group_names: groups,
            group_layers,
            top_group,
            bottom_group,
            by_name,
        })
    }

    /// Two copper layers (top, bottom) in their own groups plus two silk layers
    pub fn two_layer() -> Self {
        let layers = vec![
            Layer::copper("top", 0),
            Layer::copper("bottom", 1),
            Layer::silk("top silk", Side::Top),
            Layer::silk("bottom silk", Side::Bottom),
        ];
        Self::assemble(layers, vec!["top".into(), "bottom".into()], 0, 1)
    }

    /// Four copper layers: outer layers on the pad groups, two inner groups
    pub fn four_layer() -> Self {
        let layers = vec![
            Layer::copper("top", 0),
            Layer::copper("inner1", 1),
            Layer::copper("inner2", 2),
            Layer::copper("bottom", 3),
            Layer::silk("top silk", Side::Top),
            Layer::silk("bottom silk", Side::Bottom),
        ];
        let groups = vec!["top".into(), "inner1".into(), "inner2".into(), "bottom".into()];
        Self::assemble(layers, groups, 0, 3)
    }

    /// Infallible counterpart of `new` for the built-in stacks
    fn assemble(layers: Vec<Layer>, groups: Vec<String>, top: usize, bottom: usize) -> Self {
        let mut group_layers = vec![Vec::new(); groups.len()];
        let mut by_name = IndexMap::new();
        for (index, layer) in layers.iter().enumerate() {
            by_name.insert(layer.name.clone(), index);
            if let Some(group) = layer.group.filter(|_| layer.is_copper()) {
                group_layers[group].push(index);
            }
        }
        Self {
            layers,
            group_names: groups,
            group_layers,
            top_group: top,
            bottom_group: bottom,
            by_name,
        }
    }

    /// Re-run the consistency checks of `new` on an existing stack
    pub fn validate(&self) -> Result<(), BoardError> {
        LayerStack::new(
            self.layers.clone(),
            self.group_names.clone(),
            self.top_group,
            self.bottom_group,
        )
        .map(|_| ())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn is_copper(&self, index: usize) -> bool {
        self.layers.get(index).is_some_and(Layer::is_copper)
    }

    /// Copper layer indices in stack order
    pub fn copper_layers(&self) -> impl Iterator<Item = usize> + '_ {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.is_copper())
            .map(|(index, _)| index)
    }

    /// Silk layer indices in stack order
    pub fn silk_layers(&self) -> impl Iterator<Item = usize> + '_ {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.kind == LayerKind::Silk)
            .map(|(index, _)| index)
    }

    pub fn group_count(&self) -> usize {
        self.group_layers.len()
    }

    pub fn group_name(&self, group: usize) -> Option<&str> {
        self.group_names.get(group).map(String::as_str)
    }

    /// Copper layers belonging to `group`, stack order
    pub fn group_layers(&self, group: usize) -> &[usize] {
        self.group_layers.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn group_of(&self, layer: usize) -> Option<usize> {
        self.layers
            .get(layer)
            .filter(|l| l.is_copper())
            .and_then(|l| l.group)
    }

    /// Pseudo-group a pad on `side` belongs to
    pub fn pad_group(&self, side: Side) -> usize {
        match side {
            Side::Top => self.top_group,
            Side::Bottom => self.bottom_group,
        }
    }

    /// Pad sides whose pseudo-group is `group`
    pub fn sides_of_group(&self, group: usize) -> impl Iterator<Item = Side> + '_ {
        Side::ALL
            .into_iter()
            .filter(move |side| self.pad_group(*side) == group)
    }

    pub fn is_no_drc(&self, layer: usize) -> bool {
        self.layers.get(layer).is_some_and(|l| l.no_drc)
    }
}

impl TryFrom<LayerStackSpec> for LayerStack {
    type Error = BoardError;

    fn try_from(spec: LayerStackSpec) -> Result<Self, Self::Error> {
        LayerStack::new(spec.layers, spec.groups, spec.top_group, spec.bottom_group)
    }
}

impl From<LayerStack> for LayerStackSpec {
    fn from(stack: LayerStack) -> Self {
        LayerStackSpec {
            layers: stack.layers,
            groups: stack.group_names,
            top_group: stack.top_group,
            bottom_group: stack.bottom_group,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_layer_groups() {
        let stack = LayerStack::two_layer();
        assert_eq!(stack.copper_layers().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(stack.silk_layers().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(stack.group_layers(0), &[0]);
        assert_eq!(stack.pad_group(Side::Bottom), 1);
        assert_eq!(stack.group_of(2), None);
        assert_eq!(stack.layer_index("bottom silk"), Some(3));
    }

    #[test]
    fn test_shared_group() {
        let layers = vec![
            Layer::copper("top", 0),
            Layer::copper("top fill", 0),
            Layer::copper("bottom", 1),
        ];
        let stack = LayerStack::new(layers, vec!["a".into(), "b".into()], 0, 1).unwrap();
        assert_eq!(stack.group_layers(0), &[0, 1]);
        assert_eq!(stack.sides_of_group(0).collect::<Vec<_>>(), vec![Side::Top]);
        assert_eq!(stack.sides_of_group(1).collect::<Vec<_>>(), vec![Side::Bottom]);
    }

    #[test]
    fn test_rejects_bad_group() {
        let layers = vec![Layer::copper("top", 4)];
        let err = LayerStack::new(layers, vec!["a".into()], 0, 0).unwrap_err();
        assert_eq!(err, BoardError::BadGroup { group: 4, count: 1 });
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let layers = vec![Layer::copper("top", 0), Layer::copper("top", 0)];
        let err = LayerStack::new(layers, vec!["a".into()], 0, 0).unwrap_err();
        assert_eq!(err, BoardError::DuplicateLayer("top".into()));
    }
}
