// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire codecs: length-prefixed framing and the field-by-field payload
//! schema carried inside each frame.

pub mod frame;
pub mod payload;
pub mod wire;
