use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;

/// Top level wire message from the tracking daemon.
///
/// Everything except `timestamp` is optional on purpose: the daemon also
/// sends handshake/control messages on the same socket, and those carry no
/// `timestamp` field. The decoder uses that to tell frames apart from
/// control chatter.
#[derive(Deserialize, Debug)]
pub struct RawMessage {
    pub id: Option<i64>,
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub hands: Vec<RawHand>,
    #[serde(default)]
    pub pointables: Vec<RawPointable>,
    #[serde(default)]
    pub gestures: Vec<RawGesture>,
    pub r: Option<[[f32; 3]; 3]>,
    pub t: Option<[f32; 3]>,
    pub s: Option<f32>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RawHand {
    pub id: i32,
    pub direction: [f32; 3],
    pub palm_normal: [f32; 3],
    pub palm_position: [f32; 3],
    pub r: [[f32; 3]; 3],
    pub s: f32,
    pub sphere_center: [f32; 3],
    pub sphere_radius: f32,
    pub t: [f32; 3],
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RawPointable {
    pub id: i32,
    pub hand_id: Option<i32>,
    pub length: f32,
    pub tool: bool,
    pub direction: [f32; 3],
    pub tip_position: [f32; 3],
    pub tip_velocity: [f32; 3],
    pub width: Option<f32>,
}

/// Gesture element. The `type` string selects which of the optional
/// type-specific fields are meaningful; the decoder matches on it once and
/// builds a closed variant.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RawGesture {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: String,
    pub state: String,
    pub duration: i64,
    #[serde(default)]
    pub hand_ids: Vec<i32>,
    #[serde(default)]
    pub pointable_ids: Vec<i32>,
    pub center: Option<[f32; 3]>,
    pub normal: Option<[f32; 3]>,
    pub progress: Option<f32>,
    pub radius: Option<f32>,
    pub start_position: Option<[f32; 3]>,
    pub position: Option<[f32; 3]>,
    pub direction: Option<[f32; 3]>,
    pub speed: Option<f32>,
}

pub fn vec3(v: [f32; 3]) -> Vector3<f32> {
    Vector3::new(v[0], v[1], v[2])
}

pub fn mat3(m: [[f32; 3]; 3]) -> Matrix3<f32> {
    Matrix3::new(
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
    )
}
