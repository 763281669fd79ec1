//! Infotécnica and REUC API constants

use std::fmt;

/// Infotécnica REST API root
pub const INFOTECNICA_BASE_URL: &str = "https://api-infotecnica.coordinador.cl/v1/";

/// REUC registry endpoint listing coordinated companies
pub const REUC_BASE_URL: &str =
    "https://citizen-cen-api.apps.prod-os-1.coordinador.cl/reuc/v1/coordinados";

/// REUC requests time out after this many seconds
pub const REUC_TIMEOUT_SECS: u64 = 30;

/// Rows per page for paginated listings
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Concurrent ficha requests for most resources
pub const DEFAULT_DETAIL_WORKERS: usize = 40;

/// Concurrent ficha requests for current transformers, a much longer listing
pub const CT_DETAIL_WORKERS: usize = 60;

/// Query parameter names used by paginated listings
pub mod params {
    pub const PAGE: &str = "page";
    pub const PAGE_SIZE: &str = "page_size";
    pub const USER_KEY: &str = "user_key";
}

/// Technical sheet ("ficha técnica") slugs
pub mod fichas {
    pub const GENERAL: &str = "general";
    pub const THERMAL_LIMITS: &str = "limites-termicos";
}

/// Listable Infotécnica resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Line sections
    SectionSegments,
    /// Current transformers
    CurrentTransformers,
    /// Line segments between two terminals
    Segments,
    /// Coordinated company groups (market agents)
    Groups,
    /// Power plants
    Plants,
    /// Generating units
    GeneratingUnits,
}

impl Resource {
    /// Path relative to the API root
    pub fn path(self) -> &'static str {
        match self {
            Resource::SectionSegments => "secciones-tramos/",
            Resource::CurrentTransformers => "transformadores-corrientes/",
            Resource::Segments => "tramos/",
            Resource::Groups => "grupos",
            Resource::Plants => "centrales/",
            Resource::GeneratingUnits => "unidades-generadoras/",
        }
    }

    /// Path of one entity's technical sheet
    pub fn ficha_path(self, id: &str, ficha: &str) -> String {
        format!(
            "{}/{}/fichas-tecnicas/{}/",
            self.path().trim_end_matches('/'),
            id,
            ficha
        )
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().trim_end_matches('/'))
    }
}
