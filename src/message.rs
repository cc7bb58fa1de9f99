use crate::{
    common::{ColorIdx, ColorRGB, SetKind, SpritesetId, SubpaletteIdx},
    sprite::{RotateDirection, ShiftDirection},
    undo::{SpriteKey, SubpaletteKey},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tool {
    Pencil,
    Eraser,
    Eyedropper,
    FloodFill,
}

/// What a click does to the sprite under the cursor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClickOp {
    Paint,
    Erase,
    PickColor,
    FloodFill,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Pencil, Tool::Eraser, Tool::Eyedropper, Tool::FloodFill];

    pub fn click_op(self) -> ClickOp {
        match self {
            Tool::Pencil => ClickOp::Paint,
            Tool::Eraser => ClickOp::Erase,
            Tool::Eyedropper => ClickOp::PickColor,
            Tool::FloodFill => ClickOp::FloodFill,
        }
    }

    // Label used for the undo entry of an edit made with this tool.
    pub fn description(self) -> &'static str {
        match self {
            Tool::Pencil => "Pencil",
            Tool::Eraser => "Eraser",
            Tool::Eyedropper => "Eyedropper",
            Tool::FloodFill => "Flood fill",
        }
    }
}

/// A decision the caller must make before an operation can continue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dialogue {
    ConfirmResizeClip {
        sprite: SpriteKey,
        width: usize,
        height: usize,
    },
}

#[derive(Debug, Clone)]
pub enum Message {
    Click {
        sprite: SpriteKey,
        tool: Tool,
        x: usize,
        y: usize,
    },
    Stroke {
        sprite: SpriteKey,
        tool: Tool,
        points: Vec<(usize, usize)>,
    },
    ResizeSprite {
        sprite: SpriteKey,
        width: usize,
        height: usize,
    },
    ConfirmDialogue(bool),
    RotateSprite(SpriteKey, RotateDirection),
    FlipSprite {
        sprite: SpriteKey,
        horizontal: bool,
        vertical: bool,
    },
    ShiftPixels(SpriteKey, ShiftDirection),
    ClearSprite(SpriteKey),
    CopySpriteData {
        source: SpriteKey,
        target: SpriteKey,
    },
    RenameSprite(SpriteKey, String),
    SetSpriteDescription(SpriteKey, String),
    SetSpriteSubpalette(SpriteKey, SubpaletteIdx),
    AddSprite {
        kind: SetKind,
        spriteset: SpritesetId,
        width: usize,
        height: usize,
    },
    DuplicateSprite(SpriteKey),
    DeleteSprite(SpriteKey),
    SelectSubpalette(SubpaletteKey),
    SelectColor(SubpaletteKey, ColorIdx),
    SetColor {
        subpalette: SubpaletteKey,
        color_idx: ColorIdx,
        color: ColorRGB,
    },
    Undo,
    Redo,
}
