// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed CRUD operations over the tenants and jobs tables.

pub mod jobs;
pub mod tenants;
