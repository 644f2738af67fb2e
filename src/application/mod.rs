//! Application layer containing the checkout reconciliation logic.
//!
//! This module defines the `OrderReconciler`, the entry point a checkout
//! controller calls to obtain a verified gateway order for a host order. It
//! talks to the gateway, the order store and the checkout session only
//! through the ports in `domain::ports`.

pub mod reconciler;
