pub mod controller;
pub mod event;
pub mod frame;
pub mod history;
pub mod protocol;

pub use controller::Controller;
pub use event::{Event, EventDispatcher, EventKind, Handler};
pub use frame::{
    decode_message, DecodeError, Decoded, Frame, Gesture, GestureKind, GestureState, Hand,
    Pointable, PointableKind,
};
pub use history::{FrameHistory, HISTORY_CAPACITY};
