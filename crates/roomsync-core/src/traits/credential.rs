// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential lookup.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::types::Credential;

/// Supplies the current authentication token.
///
/// `None` (or an empty token) means "do not open a channel".
pub trait CredentialProvider: Send + Sync + 'static {
    fn credential(&self) -> Option<Credential>;
}

/// A swappable credential slot.
///
/// The login flow stores a token, logout or server-side revocation clears it.
/// Readers always see a consistent value without locking.
#[derive(Default)]
pub struct CredentialCell {
    inner: ArcSwapOption<Credential>,
}

impl CredentialCell {
    pub fn new(credential: Option<Credential>) -> Self {
        Self {
            inner: ArcSwapOption::from(credential.map(Arc::new)),
        }
    }

    pub fn set(&self, credential: Credential) {
        self.inner.store(Some(Arc::new(credential)));
    }

    pub fn invalidate(&self) {
        self.inner.store(None);
    }
}

impl CredentialProvider for CredentialCell {
    fn credential(&self) -> Option<Credential> {
        self.inner
            .load_full()
            .map(|c| Credential::clone(&c))
            .filter(|c| !c.is_empty())
    }
}

impl CredentialProvider for Option<Credential> {
    fn credential(&self) -> Option<Credential> {
        self.clone().filter(|c| !c.is_empty())
    }
}
