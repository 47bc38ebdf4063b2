#![allow(dead_code)]

pub mod voicescreen_env;
pub mod wav;
