use crate::protocol::{mat3, vec3, RawMessage};
use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message is not a valid frame payload: {0}")]
    MalformedMessage(#[from] serde_json::Error),
    #[error("unrecognized gesture type `{0}`")]
    UnknownGestureType(String),
}

/// Outcome of decoding one wire message. Control messages (anything without
/// a `timestamp`) decode to `Skip` and must not advance any state.
#[derive(Debug)]
pub enum Decoded {
    Frame(Frame),
    Skip,
}

/// One tracking snapshot. Owns all entities of the snapshot; every
/// cross-reference between them is an index into the owning vectors, so a
/// frame is self-contained and never points into another frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: i64,
    pub timestamp: i64,
    pub hands: Vec<Hand>,
    pub pointables: Vec<Pointable>,
    /// Indices into `pointables`, in wire order.
    pub fingers: Vec<usize>,
    /// Indices into `pointables`, in wire order.
    pub tools: Vec<usize>,
    pub gestures: Vec<Gesture>,
    pub rotation: Option<Matrix3<f32>>,
    pub translation: Option<Vector3<f32>>,
    pub scale_factor: Option<f32>,
}

impl Frame {
    /// Sentinel returned by history lookups that miss.
    pub fn invalid() -> Self {
        Frame {
            id: 0,
            timestamp: 0,
            hands: Vec::new(),
            pointables: Vec::new(),
            fingers: Vec::new(),
            tools: Vec::new(),
            gestures: Vec::new(),
            rotation: None,
            translation: None,
            scale_factor: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id != 0 || self.timestamp != 0
    }

    pub fn hand_by_id(&self, id: i32) -> Option<&Hand> {
        self.hands.iter().find(|hand| hand.id == id)
    }

    pub fn pointable_by_id(&self, id: i32) -> Option<&Pointable> {
        self.pointables.iter().find(|pointable| pointable.id == id)
    }

    /// Hand a pointable is attached to, if its `handId` resolved at decode.
    pub fn hand_of(&self, pointable: &Pointable) -> Option<&Hand> {
        pointable.hand.map(|index| &self.hands[index])
    }

    pub fn pointables_of<'a>(&'a self, hand: &'a Hand) -> impl Iterator<Item = &'a Pointable> {
        hand.pointables.iter().map(move |&index| &self.pointables[index])
    }

    pub fn fingers_of<'a>(&'a self, hand: &'a Hand) -> impl Iterator<Item = &'a Pointable> {
        hand.fingers.iter().map(move |&index| &self.pointables[index])
    }

    pub fn tools_of<'a>(&'a self, hand: &'a Hand) -> impl Iterator<Item = &'a Pointable> {
        hand.tools.iter().map(move |&index| &self.pointables[index])
    }

    pub fn finger_iter(&self) -> impl Iterator<Item = &Pointable> {
        self.fingers.iter().map(move |&index| &self.pointables[index])
    }

    pub fn tool_iter(&self) -> impl Iterator<Item = &Pointable> {
        self.tools.iter().map(move |&index| &self.pointables[index])
    }
}

#[derive(Debug, Clone)]
pub struct Hand {
    pub id: i32,
    pub direction: Vector3<f32>,
    pub palm_normal: Vector3<f32>,
    pub palm_position: Vector3<f32>,
    pub palm_velocity: Vector3<f32>,
    pub rotation: Matrix3<f32>,
    pub scale_factor: f32,
    pub sphere_center: Vector3<f32>,
    pub sphere_radius: f32,
    pub translation: Vector3<f32>,
    /// Indices into the owning frame's `pointables`.
    pub pointables: Vec<usize>,
    pub fingers: Vec<usize>,
    pub tools: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointableKind {
    Finger,
    Tool { width: f32 },
}

#[derive(Debug, Clone)]
pub struct Pointable {
    pub id: i32,
    /// Index of the owning hand in the frame, when `handId` resolved.
    pub hand: Option<usize>,
    pub length: f32,
    pub direction: Vector3<f32>,
    pub tip_position: Vector3<f32>,
    pub tip_velocity: Vector3<f32>,
    pub kind: PointableKind,
}

impl Pointable {
    pub fn is_finger(&self) -> bool {
        matches!(self.kind, PointableKind::Finger)
    }

    pub fn is_tool(&self) -> bool {
        matches!(self.kind, PointableKind::Tool { .. })
    }

    pub fn width(&self) -> Option<f32> {
        match self.kind {
            PointableKind::Tool { width } => Some(width),
            PointableKind::Finger => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Start,
    Update,
    Stop,
    Invalid,
}

impl GestureState {
    fn from_wire(state: &str) -> Self {
        match state {
            "start" => GestureState::Start,
            "update" => GestureState::Update,
            "stop" => GestureState::Stop,
            _ => GestureState::Invalid,
        }
    }
}

#[derive(Debug, Clone)]
pub enum GestureKind {
    Circle {
        center: Vector3<f32>,
        normal: Vector3<f32>,
        progress: f32,
        radius: f32,
        /// First resolved pointable, when there is one.
        pointable: Option<usize>,
    },
    Swipe {
        start_position: Vector3<f32>,
        position: Vector3<f32>,
        direction: Vector3<f32>,
        speed: f32,
    },
    ScreenTap {
        position: Vector3<f32>,
        direction: Vector3<f32>,
        progress: f32,
    },
    KeyTap {
        position: Vector3<f32>,
        direction: Vector3<f32>,
        progress: f32,
    },
}

#[derive(Debug, Clone)]
pub struct Gesture {
    pub id: i32,
    pub state: GestureState,
    pub duration_us: i64,
    /// One entry per wire `handIds` element; `None` when the id did not
    /// resolve within this frame.
    pub hands: Vec<Option<usize>>,
    /// Resolved `pointableIds` entries only; unresolved ids are dropped.
    pub pointables: Vec<usize>,
    pub kind: GestureKind,
}

impl Gesture {
    pub fn duration_seconds(&self) -> f64 {
        self.duration_us as f64 / 1_000_000.0
    }
}

/// Decodes one raw wire message into a frame, or decides to skip it.
///
/// Pure: no I/O, no state across calls. Reference resolution is strictly
/// within the frame being built.
pub fn decode_message(raw: &str) -> Result<Decoded, DecodeError> {
    let message: RawMessage = serde_json::from_str(raw)?;
    let timestamp = match message.timestamp {
        Some(timestamp) => timestamp,
        None => return Ok(Decoded::Skip),
    };

    let mut hands: Vec<Hand> = Vec::with_capacity(message.hands.len());
    for raw_hand in &message.hands {
        hands.push(Hand {
            id: raw_hand.id,
            direction: vec3(raw_hand.direction),
            palm_normal: vec3(raw_hand.palm_normal),
            palm_position: vec3(raw_hand.palm_position),
            // The protocol carries no separate velocity triple; mirrors
            // palmPosition, matching the vendor client.
            palm_velocity: vec3(raw_hand.palm_position),
            rotation: mat3(raw_hand.r),
            scale_factor: raw_hand.s,
            sphere_center: vec3(raw_hand.sphere_center),
            sphere_radius: raw_hand.sphere_radius,
            translation: vec3(raw_hand.t),
            pointables: Vec::new(),
            fingers: Vec::new(),
            tools: Vec::new(),
        });
    }

    let mut pointables: Vec<Pointable> = Vec::with_capacity(message.pointables.len());
    let mut fingers = Vec::new();
    let mut tools = Vec::new();
    for raw_pointable in &message.pointables {
        let index = pointables.len();
        let hand_index = raw_pointable
            .hand_id
            .and_then(|hand_id| hands.iter().position(|hand| hand.id == hand_id));
        if raw_pointable.tool {
            tools.push(index);
        } else {
            fingers.push(index);
        }
        if let Some(hand_index) = hand_index {
            let hand = &mut hands[hand_index];
            hand.pointables.push(index);
            if raw_pointable.tool {
                hand.tools.push(index);
            } else {
                hand.fingers.push(index);
            }
        }
        pointables.push(Pointable {
            id: raw_pointable.id,
            hand: hand_index,
            length: raw_pointable.length,
            direction: vec3(raw_pointable.direction),
            tip_position: vec3(raw_pointable.tip_position),
            tip_velocity: vec3(raw_pointable.tip_velocity),
            kind: if raw_pointable.tool {
                PointableKind::Tool {
                    width: raw_pointable.width.unwrap_or(0.0),
                }
            } else {
                PointableKind::Finger
            },
        });
    }

    let mut gestures: Vec<Gesture> = Vec::with_capacity(message.gestures.len());
    for raw_gesture in &message.gestures {
        // handIds keeps an entry per id even when unresolved; pointableIds
        // drops unresolved ids.
        let gesture_hands: Vec<Option<usize>> = raw_gesture
            .hand_ids
            .iter()
            .map(|&hand_id| hands.iter().position(|hand| hand.id == hand_id))
            .collect();
        let gesture_pointables: Vec<usize> = raw_gesture
            .pointable_ids
            .iter()
            .filter_map(|&pointable_id| {
                pointables
                    .iter()
                    .position(|pointable| pointable.id == pointable_id)
            })
            .collect();
        let kind = match raw_gesture.kind.as_str() {
            "circle" => GestureKind::Circle {
                center: vec3(raw_gesture.center.unwrap_or_default()),
                normal: vec3(raw_gesture.normal.unwrap_or_default()),
                progress: raw_gesture.progress.unwrap_or(0.0),
                radius: raw_gesture.radius.unwrap_or(0.0),
                pointable: gesture_pointables.first().copied(),
            },
            "swipe" => GestureKind::Swipe {
                start_position: vec3(raw_gesture.start_position.unwrap_or_default()),
                position: vec3(raw_gesture.position.unwrap_or_default()),
                direction: vec3(raw_gesture.direction.unwrap_or_default()),
                speed: raw_gesture.speed.unwrap_or(0.0),
            },
            "screenTap" => GestureKind::ScreenTap {
                position: vec3(raw_gesture.position.unwrap_or_default()),
                direction: vec3(raw_gesture.direction.unwrap_or_default()),
                progress: raw_gesture.progress.unwrap_or(0.0),
            },
            "keyTap" => GestureKind::KeyTap {
                position: vec3(raw_gesture.position.unwrap_or_default()),
                direction: vec3(raw_gesture.direction.unwrap_or_default()),
                progress: raw_gesture.progress.unwrap_or(0.0),
            },
            other => return Err(DecodeError::UnknownGestureType(other.to_owned())),
        };
        gestures.push(Gesture {
            id: raw_gesture.id,
            state: GestureState::from_wire(&raw_gesture.state),
            duration_us: raw_gesture.duration,
            hands: gesture_hands,
            pointables: gesture_pointables,
            kind,
        });
    }

    Ok(Decoded::Frame(Frame {
        id: message.id.unwrap_or(0),
        timestamp,
        hands,
        pointables,
        fingers,
        tools,
        gestures,
        rotation: message.r.map(mat3),
        translation: message.t.map(vec3),
        scale_factor: message.s,
    }))
}
