// Undo/redo stacks of snapshot pairs.
//
// Actions never hold references into the document: they name their target by
// stable ids, which the document resolves when an action is replayed.
use crate::{
    common::{Color555, PaletteId, SetKind, SpriteId, SpritesetId, SubpaletteIdx, NUM_COLORS},
    sprite::UndoData,
};

pub const DEFAULT_UNDO_LIMIT: usize = 256;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpriteKey {
    pub kind: SetKind,
    pub spriteset: SpritesetId,
    pub sprite: SpriteId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubpaletteKey {
    pub kind: SetKind,
    pub palette: PaletteId,
    pub subpalette: SubpaletteIdx,
}

#[derive(Debug, Clone)]
pub enum UndoAction {
    SpriteEdit {
        key: SpriteKey,
        before: UndoData,
        after: UndoData,
    },
    SubpaletteEdit {
        key: SubpaletteKey,
        before: [Color555; NUM_COLORS],
        after: [Color555; NUM_COLORS],
    },
}

impl UndoAction {
    pub fn sprite_key(&self) -> Option<SpriteKey> {
        match self {
            UndoAction::SpriteEdit { key, .. } => Some(*key),
            UndoAction::SubpaletteEdit { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub description: String,
    pub action: UndoAction,
}

#[derive(Debug)]
pub struct UndoMgr {
    undo: Vec<UndoEntry>,
    redo: Vec<UndoEntry>,
    limit: usize,
}

impl Default for UndoMgr {
    fn default() -> Self {
        UndoMgr::new(DEFAULT_UNDO_LIMIT)
    }
}

impl UndoMgr {
    pub fn new(limit: usize) -> Self {
        UndoMgr {
            undo: vec![],
            redo: vec![],
            limit: limit.max(1),
        }
    }

    /// Record a new action. Anything that was undone can no longer be redone.
    pub fn push(&mut self, description: &str, action: UndoAction) {
        self.redo.clear();
        self.undo.push(UndoEntry {
            description: description.to_string(),
            action,
        });
        if self.undo.len() > self.limit {
            let excess = self.undo.len() - self.limit;
            self.undo.drain(..excess);
        }
    }

    pub(crate) fn pop_undo(&mut self) -> Option<UndoEntry> {
        self.undo.pop()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<UndoEntry> {
        self.redo.pop()
    }

    pub(crate) fn push_undone(&mut self, entry: UndoEntry) {
        self.redo.push(entry);
    }

    pub(crate) fn push_redone(&mut self, entry: UndoEntry) {
        self.undo.push(entry);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo.last().map(|e| e.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo.last().map(|e| e.description.as_str())
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    /// Drop every action targeting a sprite that no longer exists.
    pub fn forget_sprite(&mut self, key: SpriteKey) {
        self.undo.retain(|e| e.action.sprite_key() != Some(key));
        self.redo.retain(|e| e.action.sprite_key() != Some(key));
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(sprite: SpriteId) -> SpriteKey {
        SpriteKey {
            kind: SetKind::Foreground,
            spriteset: 0,
            sprite,
        }
    }

    fn edit(sprite: SpriteId) -> UndoAction {
        let data = UndoData {
            subpalette: 0,
            name: String::new(),
            description: String::new(),
            width: 1,
            height: 1,
            tiles: vec![Default::default()],
        };
        UndoAction::SpriteEdit {
            key: key(sprite),
            before: data.clone(),
            after: data,
        }
    }

    #[test]
    fn push_clears_redo() {
        let mut mgr = UndoMgr::default();
        mgr.push("a", edit(1));
        let entry = mgr.pop_undo().unwrap();
        mgr.push_undone(entry);
        assert!(mgr.can_redo());
        assert_eq!(mgr.redo_description(), Some("a"));
        mgr.push("b", edit(1));
        assert!(!mgr.can_redo());
        assert_eq!(mgr.undo_description(), Some("b"));
    }

    #[test]
    fn limit_drops_oldest() {
        let mut mgr = UndoMgr::new(2);
        mgr.push("a", edit(1));
        mgr.push("b", edit(1));
        mgr.push("c", edit(1));
        assert_eq!(mgr.len(), 2);
        assert_eq!(mgr.pop_undo().unwrap().description, "c");
        assert_eq!(mgr.pop_undo().unwrap().description, "b");
        assert!(mgr.pop_undo().is_none());
    }

    #[test]
    fn forget_sprite_purges_both_stacks() {
        let mut mgr = UndoMgr::default();
        mgr.push("a", edit(1));
        mgr.push("b", edit(2));
        let entry = mgr.pop_undo().unwrap();
        mgr.push_undone(entry);
        mgr.forget_sprite(key(2));
        assert!(!mgr.can_redo());
        assert_eq!(mgr.len(), 1);
    }
}
