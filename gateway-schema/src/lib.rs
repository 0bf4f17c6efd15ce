// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

//! Diesel schema for the token gateway's Postgres store.

pub mod schema;
