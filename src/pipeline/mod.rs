//! Pipeline stages for Markdown-to-PDF assembly.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the rendering backend can be swapped without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ markup ──▶ template ──▶ render
//! (files)   (UTF-8, LF)   (HTML)     (Tera)       (Chromium → PDF)
//! ```
//!
//! 1. [`input`]     — read Markdown files into `SourceDocument`s
//! 2. [`normalize`] — decode bytes, drop a leading BOM and normalise line
//!    endings
//! 3. [`markup`]    — Markdown → HTML with tables and fenced code
//! 4. [`template`]  — fill the branded page, header and footer templates
//! 5. [`render`]    — print the filled document to PDF; the only stage that
//!    talks to an external process

pub mod input;
pub mod markup;
pub mod normalize;
pub mod render;
pub mod template;
