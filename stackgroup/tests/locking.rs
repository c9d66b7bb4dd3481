//! Engine operations on one project run one at a time.

mod common;

use common::*;

#[tokio::test]
async fn edit_waits_while_the_project_is_busy() {
    let fx = seeded(vec![]);
    let mut input = fx.package();
    input.layer_group_sets.retain(|s| s.is_golden);

    // Stand in for a shakeup that is still running on the same project.
    let busy = fx.engine.locks().acquire(PROJECT).await;

    let edit = fx.engine.process_lgset_changes(input);
    tokio::pin!(edit);
    for _ in 0..16 {
        tokio::select! {
            biased;
            _ = &mut edit => panic!("edit finished while the project was locked"),
            _ = tokio::task::yield_now() => {}
        }
    }
    assert!(fx.store.calls().is_empty());
    assert_eq!(fx.package().layer_group_sets.len(), 2);

    drop(busy);
    let saved = edit.await.unwrap();
    assert_eq!(saved.layer_group_sets.len(), 1);
    assert!(!fx.engine.locks().is_locked(PROJECT));
}

#[tokio::test]
async fn other_projects_do_not_block() {
    let fx = seeded(vec![]);
    let _other = fx.engine.locks().acquire("another-project").await;

    let mut pkg = fx.package();
    let mut stack = symmetric_stack();
    stack[2].material = "Megtron6".into();
    fx.engine
        .evaluate_lgsets_for_stackup_change(&stack, &mut pkg, &fx.project, false, false)
        .await
        .unwrap();

    assert!(!fx.engine.locks().is_locked(PROJECT));
    assert!(fx.engine.locks().is_locked("another-project"));
}
