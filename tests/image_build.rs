// ABOUTME: Integration tests for the full-rebuild strategies.
// ABOUTME: Image build with cache, push and rollout; compose rebuilds.

mod support;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use hotpatch::build::{
    BuildAndDeployer, BuildError, BuildResult, BuildTarget, ComposeBuildStrategy, Deployed,
    ImageBuildStrategy, ImageSpec,
};
use hotpatch::types::{ChangeSet, ImageRef, WorkloadRef};
use support::{FakeBuilder, FakeCluster, FakeCompose};
use tokio_util::sync::CancellationToken;

fn image_target_in(context: &Path) -> BuildTarget {
    let spec = ImageSpec::new(ImageRef::parse("web").unwrap(), context);
    BuildTarget::new(
        support::target_name("web"),
        WorkloadRef::new("deployment", "web"),
        context,
    )
    .with_image(spec)
}

/// A build context on disk with an app file and a Dockerfile.
fn image_project() -> (tempfile::TempDir, BuildTarget) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/app.js"), "console.log(1)").unwrap();
    let target = image_target_in(dir.path());
    (dir, target)
}

fn changes() -> ChangeSet {
    ChangeSet::new(["/project/src/app.js"])
}

mod image {
    use super::*;

    #[tokio::test]
    async fn builds_then_updates_workload() {
        support::init_tracing();
        let builder = FakeBuilder::default();
        let cluster = FakeCluster::default();
        let strategy = ImageBuildStrategy::new(Arc::new(builder.clone()), Arc::new(cluster.clone()));
        let (dir, target) = image_project();

        let result = strategy
            .build_and_deploy(&CancellationToken::new(), &target, &changes())
            .await;

        let outcome = match result {
            BuildResult::Success(outcome) => outcome,
            other => panic!("expected success, got {other:?}"),
        };
        let Deployed::Image(ref image) = outcome.deployed else {
            panic!("expected an image, got {:?}", outcome.deployed);
        };
        assert!(image.tag().unwrap().starts_with("hotpatch-"));
        assert!(!outcome.cache_hit);

        let calls = builder.log.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("cache_lookup web:hotpatch-"));
        assert!(calls[1].starts_with(&format!("build {} web:hotpatch-", dir.path().display())));
        assert_eq!(
            cluster.log.calls(),
            vec![format!("set_image deployment/web {}", image)]
        );
    }

    #[tokio::test]
    async fn cache_hit_skips_build() {
        let (_dir, target) = image_project();
        let builder = FakeBuilder {
            cached: Some(ImageRef::parse("web:hotpatch-cafe").unwrap()),
            ..FakeBuilder::default()
        };
        let cluster = FakeCluster::default();
        let strategy = ImageBuildStrategy::new(Arc::new(builder.clone()), Arc::new(cluster.clone()));

        let result = strategy
            .build_and_deploy(&CancellationToken::new(), &target, &changes())
            .await;

        match result {
            BuildResult::Success(outcome) => assert!(outcome.cache_hit),
            other => panic!("expected success, got {other:?}"),
        }
        assert!(builder.log.matching("build").is_empty());
        assert_eq!(
            cluster.log.calls(),
            vec!["set_image deployment/web web:hotpatch-cafe"]
        );
    }

    #[tokio::test]
    async fn registry_push_precedes_rollout() {
        let (_dir, target) = image_project();
        let builder = FakeBuilder::default();
        let cluster = FakeCluster::default();
        let strategy = ImageBuildStrategy::new(Arc::new(builder.clone()), Arc::new(cluster.clone()))
            .with_registry("registry.example.com");

        let result = strategy
            .build_and_deploy(&CancellationToken::new(), &target, &changes())
            .await;

        assert!(matches!(result, BuildResult::Success(_)));
        let pushed = builder.log.matching("push");
        assert_eq!(pushed.len(), 1);
        assert!(pushed[0].starts_with("push registry.example.com/web:hotpatch-"));
        assert_eq!(cluster.log.calls().len(), 1);
    }

    #[tokio::test]
    async fn manifest_is_applied_before_image_update() {
        let cluster = FakeCluster::default();
        let strategy =
            ImageBuildStrategy::new(Arc::new(FakeBuilder::default()), Arc::new(cluster.clone()));
        let (_dir, target) = image_project();
        let target = target.with_manifest("/project/k8s/web.yaml");

        let result = strategy
            .build_and_deploy(&CancellationToken::new(), &target, &changes())
            .await;

        assert!(matches!(result, BuildResult::Success(_)));
        let calls = cluster.log.calls();
        assert_eq!(calls[0], "apply /project/k8s/web.yaml");
        assert!(calls[1].starts_with("set_image deployment/web"));
    }

    #[tokio::test]
    async fn build_failure_is_fatal_and_skips_deploy() {
        let (_dir, target) = image_project();
        let builder = FakeBuilder {
            fail_build: true,
            ..FakeBuilder::default()
        };
        let cluster = FakeCluster::default();
        let strategy = ImageBuildStrategy::new(Arc::new(builder), Arc::new(cluster.clone()));

        let result = strategy
            .build_and_deploy(&CancellationToken::new(), &target, &changes())
            .await;

        assert!(matches!(result, BuildResult::Fatal(BuildError::Image(_))));
        assert!(cluster.log.is_empty());
    }

    #[tokio::test]
    async fn target_without_image_is_not_applicable() {
        let strategy = ImageBuildStrategy::new(
            Arc::new(FakeBuilder::default()),
            Arc::new(FakeCluster::default()),
        );
        let target = BuildTarget::new(
            support::target_name("web"),
            WorkloadRef::new("deployment", "web"),
            "/project",
        );
        assert!(!strategy.can_apply(&target, &changes()));
        assert!(strategy.can_apply(&image_target_in(Path::new("/project")), &changes()));
    }

    #[tokio::test]
    async fn cancelled_token_prevents_build() {
        let builder = FakeBuilder::default();
        let strategy =
            ImageBuildStrategy::new(Arc::new(builder.clone()), Arc::new(FakeCluster::default()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = strategy
            .build_and_deploy(&cancel, &image_target_in(Path::new("/project")), &changes())
            .await;

        match result {
            BuildResult::Fatal(err) => assert!(err.is_cancelled()),
            other => panic!("expected cancellation, got {other:?}"),
        }
        assert!(builder.log.is_empty());
    }
}

mod context {
    use super::*;

    #[tokio::test]
    async fn edit_outside_the_change_set_misses_the_cache() {
        let builder = FakeBuilder::default();
        let strategy = ImageBuildStrategy::new(
            Arc::new(builder.clone()),
            Arc::new(FakeCluster::default()),
        );
        let (dir, target) = image_project();
        let app_only = ChangeSet::new([dir.path().join("src/app.js")]);

        strategy
            .build_and_deploy(&CancellationToken::new(), &target, &app_only)
            .await;
        fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();
        strategy
            .build_and_deploy(&CancellationToken::new(), &target, &app_only)
            .await;

        let lookups = builder.log.matching("cache_lookup");
        assert_eq!(lookups.len(), 2);
        assert_ne!(lookups[0], lookups[1], "Dockerfile edit must change the image tag");
    }

    #[tokio::test]
    async fn unchanged_context_reuses_the_same_tag() {
        let builder = FakeBuilder::default();
        let strategy = ImageBuildStrategy::new(
            Arc::new(builder.clone()),
            Arc::new(FakeCluster::default()),
        );
        let (_dir, target) = image_project();

        for _ in 0..2 {
            strategy
                .build_and_deploy(&CancellationToken::new(), &target, &changes())
                .await;
        }

        let lookups = builder.log.matching("cache_lookup");
        assert_eq!(lookups[0], lookups[1]);
    }

    #[tokio::test]
    async fn unreadable_context_is_fatal_before_any_build() {
        let builder = FakeBuilder::default();
        let cluster = FakeCluster::default();
        let strategy = ImageBuildStrategy::new(Arc::new(builder.clone()), Arc::new(cluster.clone()));
        let target = image_target_in(Path::new("/nonexistent/hotpatch/context"));

        let result = strategy
            .build_and_deploy(&CancellationToken::new(), &target, &changes())
            .await;

        assert!(matches!(result, BuildResult::Fatal(BuildError::Context { .. })));
        assert!(builder.log.is_empty());
        assert!(cluster.log.is_empty());
    }
}

mod compose {
    use super::*;

    fn compose_target() -> BuildTarget {
        BuildTarget::new(
            support::target_name("web"),
            WorkloadRef::new("service", "web"),
            "/project",
        )
        .with_compose_service("frontend")
    }

    #[tokio::test]
    async fn rebuilds_the_service() {
        let compose = FakeCompose::default();
        let strategy = ComposeBuildStrategy::new(Arc::new(compose.clone()));

        let result = strategy
            .build_and_deploy(&CancellationToken::new(), &compose_target(), &changes())
            .await;

        match result {
            BuildResult::Success(outcome) => {
                assert_eq!(
                    outcome.deployed,
                    Deployed::ComposeService("frontend".to_string())
                );
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(compose.log.calls(), vec!["compose_up frontend /project"]);
    }

    #[tokio::test]
    async fn image_context_becomes_compose_context() {
        let compose = FakeCompose::default();
        let strategy = ComposeBuildStrategy::new(Arc::new(compose.clone()));
        let target = compose_target().with_image(ImageSpec::new(
            ImageRef::parse("web").unwrap(),
            "/project/web",
        ));

        let result = strategy
            .build_and_deploy(&CancellationToken::new(), &target, &changes())
            .await;

        assert!(matches!(result, BuildResult::Success(_)));
        assert_eq!(compose.log.calls(), vec!["compose_up frontend /project/web"]);
    }

    #[tokio::test]
    async fn target_without_service_is_not_applicable() {
        let strategy = ComposeBuildStrategy::new(Arc::new(FakeCompose::default()));
        assert!(!strategy.can_apply(&image_target_in(Path::new("/project")), &changes()));
        assert!(strategy.can_apply(&compose_target(), &changes()));
    }
}
