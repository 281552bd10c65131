use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Face database every registration and deletion is addressed to.
pub const FACE_DATABASE_NAME: &str = "people";

/// Face rectangle in pixel coordinates of the normalized image, as the engine reports it.
///
/// The engine does not promise `right >= left` or `bottom >= top`, so derived
/// widths and heights may be negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

impl BoundingBox {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Absolute pixel area, independent of the engine's coordinate convention.
    pub fn area(&self) -> i64 {
        ((i64::from(self.top) - i64::from(self.bottom))
            * (i64::from(self.right) - i64::from(self.left)))
        .abs()
    }
}

/// A face found by `find_all_in_image`.
///
/// `identity` is present only when the engine reported a positive match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub identity: Option<Uuid>,
}

impl DetectedFace {
    pub fn new(bbox: &BoundingBox, identity: Option<Uuid>) -> Self {
        Self {
            left: bbox.left,
            top: bbox.top,
            width: bbox.width(),
            height: bbox.height(),
            identity,
        }
    }
}

/// Database/identity pair submitted verbatim to the engine's register and delete calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub database: String,
    pub identity: String,
}

impl Registration {
    pub fn for_identity(identity: Uuid) -> Self {
        Self {
            database: FACE_DATABASE_NAME.to_string(),
            identity: identity.to_string(),
        }
    }
}

/// Output of the engine's detection call.
///
/// `count` is the engine's own figure and is authoritative; it can be
/// negative when the engine signals an error.
#[derive(Debug, Clone, Default)]
pub struct FaceDetection {
    pub count: i32,
    pub boxes: Vec<BoundingBox>,
}

/// One per-face entry of the engine's recognition call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedFace {
    pub bbox: BoundingBox,
    /// `0` means the face matched `identity`; anything else means unmatched.
    pub decision: i32,
    pub identity: String,
}

impl RecognizedFace {
    pub fn is_match(&self) -> bool {
        self.decision == 0
    }
}

/// Output of the engine's recognition call.
#[derive(Debug, Clone, Default)]
pub struct FaceRecognition {
    pub count: i32,
    pub faces: Vec<RecognizedFace>,
}
