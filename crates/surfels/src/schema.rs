//! Attribute dispatch table
//!
//! For every attribute the table records where reads come from: the stored
//! column, a derivation from other stored attributes, or the documented
//! default. The table is resolved once per schema change from the whole
//! stored set, since whether an attribute is derivable depends on which other
//! attributes are stored alongside it:
//!
//! | attribute     | derived when stored set contains | derivation                              |
//! |---------------|----------------------------------|-----------------------------------------|
//! | normal        | tangent axes                     | normalized cross product of the axes    |
//! | radius        | tangent axes                     | mean length of the two axes             |
//! | tangent axes  | normal or radius                 | frame around the normal, scaled by radius |
//!
//! Every other attribute is either stored or defaulted.

use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, AttributeSet};

/// Where reads of one attribute are served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    /// Read from the attribute's own column
    Native,
    /// Computed from other stored attributes
    Derived,
    /// No source; the documented default is returned
    Default,
}

/// Per-attribute read routes for one schema value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTable {
    stored: AttributeSet,
    routes: [Route; Attribute::COUNT],
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::resolve(AttributeSet::empty())
    }
}

impl DispatchTable {
    /// Resolve the routes for a stored attribute set
    pub fn resolve(stored: AttributeSet) -> Self {
        let mut routes = [Route::Default; Attribute::COUNT];
        for attribute in Attribute::ALL {
            routes[attribute.index()] = if stored.contains(attribute.bit()) {
                Route::Native
            } else if derivable(attribute, stored) {
                Route::Derived
            } else {
                Route::Default
            };
        }
        Self { stored, routes }
    }

    /// Attributes with physical storage
    #[inline]
    pub fn stored(&self) -> AttributeSet {
        self.stored
    }

    #[inline]
    pub fn route(&self, attribute: Attribute) -> Route {
        self.routes[attribute.index()]
    }

    /// Attributes readable without falling back to defaults
    pub fn available(&self) -> AttributeSet {
        Attribute::ALL
            .into_iter()
            .filter(|&attribute| self.route(attribute) != Route::Default)
            .fold(AttributeSet::empty(), |set, attribute| set | attribute.bit())
    }
}

fn derivable(attribute: Attribute, stored: AttributeSet) -> bool {
    match attribute {
        Attribute::Normal | Attribute::Radius => stored.contains(AttributeSet::TANGENT_AXES),
        Attribute::TangentAxes => stored.intersects(AttributeSet::NORMAL | AttributeSet::RADIUS),
        _ => false,
    }
}
