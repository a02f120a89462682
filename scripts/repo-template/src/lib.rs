// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![expect(rustdoc::redundant_explicit_links, reason = "Needed to support cargo-rdme link mapping.")]

//! This is my crate. It is a very good crate, it is a very nice crate.

#![doc(
    html_logo_url = "https://media.githubusercontent.com/media/microsoft/oxidizer/refs/heads/main/crates/CRATE_NAME/logo.png"
)]
#![doc(
    html_favicon_url = "https://media.githubusercontent.com/media/microsoft/oxidizer/refs/heads/main/crates/CRATE_NAME/favicon.ico"
)]

