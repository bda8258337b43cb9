//! Mock device implementations for testing and development.
//!
//! This module provides a simulated sensor that can be controlled
//! programmatically without requiring physical hardware.

pub mod sensor;

pub use sensor::{
    DEFAULT_CHUNK_SIZE, MATCH_CONFIDENCE, MockSensor, MockSensorHandle, ScriptedCapture,
    SensorCall, SensorOp,
};
