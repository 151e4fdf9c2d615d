/// Integration tests for concurrent conversations: several readers of one
/// tree share a single encode task, and trees of different ids do not wait
/// on each other.

use std::{
    sync::{Arc, Barrier},
    thread,
};

use treesync_shared::{
    GetTreeRequest, ObjectData, RefState, RpcHandler, Session, SessionConfig, Tree, TreeId, Value,
};
use treesync_test::{
    codecs, init_logging, session_pair, test_config,
    toy::{self, render, TypeDesc},
    visitors::{self, APPEND_LITERAL},
    ScriptedTransport,
};

fn serving_session(batch_size: usize) -> Session {
    let config = SessionConfig {
        batch_size,
        ..test_config()
    };
    Session::new(
        config,
        codecs(),
        visitors::visitors(),
        Arc::new(ScriptedTransport::new(false, Vec::new())),
    )
    .unwrap()
}

/// Two readers pulling the same tree at once attach to one encode task
#[test]
fn one_encode_task_per_tree() {
    init_logging();
    let session = serving_session(2);
    let tree = toy::unit("main", (0..10).map(toy::literal).collect());
    let tree_id = session.track(&tree).unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let session = session.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                session.handle_get_tree(GetTreeRequest::next(tree_id)).unwrap()
            })
        })
        .collect();
    let mut pulled: Vec<_> = readers
        .into_iter()
        .map(|reader| reader.join().unwrap())
        .collect();

    assert_eq!(session.stats().encode_tasks_started, 1);
    assert!(pulled.iter().all(|batch| batch.len() == 2));

    // drain the rest of the conversation
    loop {
        let batch = session.handle_get_tree(GetTreeRequest::next(tree_id)).unwrap();
        let done = batch.last().map(ObjectData::is_terminal).unwrap_or(false);
        pulled.push(batch);
        if done {
            break;
        }
    }
    assert_eq!(session.stats().encode_tasks_started, 1);
    assert_eq!(session.stats().trees_sent, 1);
    // 5 units for the root, 5 per literal, then END_OF_OBJECT
    assert_eq!(pulled.iter().map(Vec::len).sum::<usize>(), 56);

    // the peer now holds the tree, so the next conversation is a bare no-op
    let next = session.handle_get_tree(GetTreeRequest::start(tree_id)).unwrap();
    assert_eq!(
        next,
        vec![ObjectData::no_change(), ObjectData::end_of_object()]
    );
    assert_eq!(session.stats().encode_tasks_started, 2);
}

fn drain(session: &Session, tree_id: TreeId, mut units: Vec<ObjectData>) -> Vec<ObjectData> {
    loop {
        let batch = session.handle_get_tree(GetTreeRequest::next(tree_id)).unwrap();
        let done = batch.last().map(ObjectData::is_terminal).unwrap_or(false);
        units.extend(batch);
        if done {
            return units;
        }
    }
}

fn type_desc_units(units: &[ObjectData]) -> Vec<&ObjectData> {
    units.iter().filter(|unit| unit.reference.is_some()).collect()
}

/// A shared value introduced by a conversation that has not finished yet is
/// sent in full by the others, since the peer may not have it
#[test]
fn pending_ref_is_sent_in_full_by_other_conversations() {
    init_logging();
    let session = serving_session(16);
    let int = TypeDesc::new("int");
    let first = toy::unit(
        "first",
        [vec![toy::ident("x", Some(&int))], (0..10).map(toy::literal).collect()].concat(),
    );
    let second = toy::unit("second", vec![toy::ident("y", Some(&int))]);
    let first_id = session.track(&first).unwrap();
    let second_id = session.track(&second).unwrap();

    // the first batch of the first tree already carries the type
    let started = session
        .handle_get_tree(GetTreeRequest::start(first_id))
        .unwrap();
    assert!(!started.last().unwrap().is_terminal());
    assert_eq!(
        type_desc_units(&started),
        vec![&ObjectData::add(Some("toy.TypeDesc".to_string()), None, Some(1))]
    );
    assert_eq!(session.ref_state(&int).unwrap(), RefState::Pending);

    let second_units = drain(&session, second_id, Vec::new());
    assert_eq!(
        type_desc_units(&second_units),
        vec![&ObjectData::add(Some("toy.TypeDesc".to_string()), None, Some(1))]
    );
    assert_eq!(session.ref_state(&int).unwrap(), RefState::Committed);

    drain(&session, first_id, started);

    // once committed, a later conversation sends the ref alone
    let third = toy::unit("third", vec![toy::ident("z", Some(&int))]);
    let third_id = session.track(&third).unwrap();
    let third_units = drain(&session, third_id, Vec::new());
    assert_eq!(
        type_desc_units(&third_units),
        vec![&ObjectData::add(None, None, Some(1))]
    );
}

/// Visits of different trees run side by side over one pair of sessions
#[test]
fn visits_of_different_trees_run_concurrently() {
    let pair = Arc::new(session_pair(test_config()));
    let barrier = Arc::new(Barrier::new(4));

    let workers: Vec<_> = (0..4)
        .map(|index| {
            let pair = pair.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let tree = toy::unit(&format!("unit{}", index), vec![toy::literal(index)]);
                barrier.wait();
                let result = pair
                    .local
                    .visit(&tree, APPEND_LITERAL, Some(Value::Int(index * 10)))
                    .unwrap();
                (tree, result)
            })
        })
        .collect();

    for worker in workers {
        let (tree, result) = worker.join().unwrap();
        let statements = toy::statements(&result);
        assert_eq!(statements.len(), 2);
        assert!(Arc::ptr_eq(&statements[0], &toy::statements(&tree)[0]));
        let remote = pair
            .remote
            .local_tree(tree.tree_id().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(render(&remote), render(&result));
    }
    assert_eq!(pair.local.stats().trees_received, 4);
    assert_eq!(pair.remote.stats().trees_received, 4);
}
