// SPDX-License-Identifier: MIT
//! # memori-editor — Editor core for memori
//!
//! The thin layer between key events and frames:
//!
//! - **[`state`]** — `EditorState`: cursor, viewport, the loaded line, and
//!   how key events move the cursor
//! - **[`document`]** — `Document`: the first line of a file on disk
//! - **[`view`]** — `Renderer`: composes one full-screen frame from the state

pub mod document;
pub mod state;
pub mod view;
