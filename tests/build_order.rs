// ABOUTME: Integration tests for build-order composition.
// ABOUTME: Mode filtering, environment filtering and the empty-order error.

mod support;

use hotpatch::build::{
    BuildOrder, ClusterLocation, DeployKind, Environment, OrderError, Strategies, StrategyKind,
    UpdateMode,
};
use hotpatch::runtime::RuntimeType;
use support::{CallLog, Script, ScriptedStrategy};

use StrategyKind::{ComposeBuild, ContainerPatch, ImageBuild};

fn all_strategies() -> Strategies {
    let log = CallLog::default();
    Strategies {
        container_patch: Some(ScriptedStrategy::new(ContainerPatch, Script::Succeed, &log).shared()),
        image_build: Some(ScriptedStrategy::new(ImageBuild, Script::Succeed, &log).shared()),
        compose_build: Some(ScriptedStrategy::new(ComposeBuild, Script::Succeed, &log).shared()),
    }
}

fn local_cluster() -> Environment {
    Environment::new(
        DeployKind::Cluster(ClusterLocation::Local),
        Some(RuntimeType::Docker),
    )
}

fn compose() -> Environment {
    Environment::new(DeployKind::Compose, Some(RuntimeType::Podman))
}

fn kinds(env: &Environment, mode: UpdateMode) -> Vec<StrategyKind> {
    BuildOrder::compose(&all_strategies(), env, mode)
        .unwrap()
        .kinds()
}

#[test]
fn auto_mode_on_local_cluster_patches_then_rebuilds() {
    assert_eq!(
        kinds(&local_cluster(), UpdateMode::Auto),
        vec![ContainerPatch, ImageBuild]
    );
}

#[test]
fn auto_mode_on_compose_uses_compose_build() {
    assert_eq!(
        kinds(&compose(), UpdateMode::Auto),
        vec![ContainerPatch, ComposeBuild]
    );
}

#[test]
fn full_build_only_never_patches() {
    for env in [local_cluster(), compose()] {
        let order = kinds(&env, UpdateMode::FullBuildOnly);
        assert!(!order.contains(&ContainerPatch), "{env:?} gave {order:?}");
        assert_eq!(order.len(), 1);
    }
}

#[test]
fn live_only_never_rebuilds() {
    for env in [local_cluster(), compose()] {
        assert_eq!(kinds(&env, UpdateMode::LiveOnly), vec![ContainerPatch]);
    }
}

#[test]
fn remote_cluster_only_rebuilds() {
    let env = Environment::new(
        DeployKind::Cluster(ClusterLocation::Remote),
        Some(RuntimeType::Docker),
    );
    assert_eq!(kinds(&env, UpdateMode::Auto), vec![ImageBuild]);
}

#[test]
fn no_runtime_drops_container_patch() {
    let env = Environment::new(DeployKind::Cluster(ClusterLocation::Local), None);
    assert_eq!(kinds(&env, UpdateMode::Auto), vec![ImageBuild]);
}

#[test]
fn live_only_on_remote_cluster_has_no_strategies() {
    let env = Environment::new(
        DeployKind::Cluster(ClusterLocation::Remote),
        Some(RuntimeType::Docker),
    );
    let err = BuildOrder::compose(&all_strategies(), &env, UpdateMode::LiveOnly).unwrap_err();
    assert!(matches!(
        err,
        OrderError::NoStrategies {
            mode: UpdateMode::LiveOnly,
            ..
        }
    ));
}

#[test]
fn live_only_without_runtime_is_rejected() {
    let env = Environment::new(DeployKind::Compose, None);
    let err = BuildOrder::compose(&all_strategies(), &env, UpdateMode::LiveOnly).unwrap_err();
    assert!(matches!(err, OrderError::LiveOnlyWithoutRuntime));
}

#[test]
fn missing_slots_are_skipped() {
    let strategies = Strategies {
        container_patch: None,
        ..all_strategies()
    };
    let order = BuildOrder::compose(&strategies, &local_cluster(), UpdateMode::Auto).unwrap();
    assert_eq!(order.kinds(), vec![ImageBuild]);
    assert_eq!(format!("{order:?}"), "[ImageBuild]");
}

#[test]
fn composition_is_deterministic() {
    let strategies = all_strategies();
    let first = BuildOrder::compose(&strategies, &compose(), UpdateMode::Auto).unwrap();
    let second = BuildOrder::compose(&strategies, &compose(), UpdateMode::Auto).unwrap();
    assert_eq!(first.kinds(), second.kinds());
}

#[test]
fn empty_order_cannot_be_built() {
    assert!(BuildOrder::new(Vec::new()).is_none());
}
