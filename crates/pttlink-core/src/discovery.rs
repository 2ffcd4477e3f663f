// ── Controller discovery ──
//
// Picks the controller build to talk to. A hint names exactly one package
// and skips the capability-marker check; without a hint the known builds
// are tried in configured order.

use pttlink_api::{PackageInfo, PackageManager};
use tracing::debug;

use crate::config::{KnownController, SessionConfig};

/// What discovery learned about the resolved controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub package: String,
    pub service: String,
    pub version: u32,
    /// The package declares the capability marker.
    pub marker: bool,
}

/// Resolve a controller identity, or `None` when nothing compatible is installed.
pub fn discover<P: PackageManager + ?Sized>(
    packages: &P,
    config: &SessionConfig,
    hint: Option<&str>,
) -> Option<Capabilities> {
    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        let candidate = KnownController::new(hint.to_ascii_lowercase());
        return probe(packages, config, &candidate);
    }
    config
        .known_controllers
        .iter()
        .find_map(|candidate| probe(packages, config, candidate))
}

/// Whether a package event names a controller this session could use.
pub(crate) fn is_candidate(config: &SessionConfig, hint: Option<&str>, package: &str) -> bool {
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(hint) => hint.eq_ignore_ascii_case(package),
        None => config
            .known_controllers
            .iter()
            .any(|c| c.package.eq_ignore_ascii_case(package)),
    }
}

fn probe<P: PackageManager + ?Sized>(
    packages: &P,
    config: &SessionConfig,
    candidate: &KnownController,
) -> Option<Capabilities> {
    let info = packages.package_info(&candidate.package)?;
    let marker = info.metadata.get_bool(&config.capability_marker, false);
    if candidate.requires_marker && !marker {
        debug!(package = %candidate.package, "skipping controller without capability marker");
        return None;
    }
    if info.version < candidate.min_version {
        debug!(
            package = %candidate.package,
            version = info.version,
            min_version = candidate.min_version,
            "skipping outdated controller"
        );
        return None;
    }
    let Some(service) = find_service(&info, &config.service_names) else {
        debug!(package = %candidate.package, "controller exports no known service");
        return None;
    };
    Some(Capabilities {
        package: info.package.clone(),
        service,
        version: info.version,
        marker,
    })
}

fn find_service(info: &PackageInfo, names: &[String]) -> Option<String> {
    names.iter().find(|name| info.exports(name)).cloned()
}
