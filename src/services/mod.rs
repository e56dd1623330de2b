mod platform;

pub use platform::{
    determine_platform_name, extract_domain, parse_site_meta, PlatformResolver, SiteMeta,
};
