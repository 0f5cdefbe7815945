#![allow(dead_code)]

pub mod cropyield_env;
pub mod fixtures;
