// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer

pub mod camera;
