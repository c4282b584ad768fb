use tracing::debug;

use crate::configs::ServiceDescriptor;
use crate::service_register_center::typos::RegistryCandidate;

/// Picks the registry to register with.
///
/// Keeps only `type == "registry"` entries and returns the one with the
/// highest priority. The sort is stable, so equal priorities keep their
/// configured order, but callers must not rely on which of them wins.
pub fn select_registry(services: &[ServiceDescriptor]) -> Option<RegistryCandidate> {
    let mut candidates: Vec<RegistryCandidate> = services
        .iter()
        .filter_map(RegistryCandidate::from_descriptor)
        .collect();

    // 优先级高的排在前面
    candidates.sort_by(|a, b| b.cmp_priority(a));

    debug!(
        "{} registry candidate(s) among {} configured service(s)",
        candidates.len(),
        services.len()
    );

    candidates.into_iter().next()
}
