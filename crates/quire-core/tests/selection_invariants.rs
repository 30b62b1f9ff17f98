//! Property tests for the selection invariants.
//!
//! Random sequences of open/select/close operations must always leave the
//! session with a selection exactly when documents are open, and the
//! selection within bounds.

use proptest::prelude::*;
use quire_core::{Config, MemoryFileSystem, ProjectContext, SessionController};
use std::sync::Arc;

const FILES: [&str; 5] = ["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"];

#[derive(Debug, Clone)]
enum Op {
    Open(usize),
    Select(usize),
    Close(usize),
    CloseOthers,
    CloseAll,
    Undo,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..FILES.len()).prop_map(Op::Open),
        2 => (0..6usize).prop_map(Op::Select),
        3 => (0..6usize).prop_map(Op::Close),
        1 => Just(Op::CloseOthers),
        1 => Just(Op::CloseAll),
        1 => Just(Op::Undo),
    ]
}

fn new_session() -> SessionController {
    let fs = FILES
        .iter()
        .fold(MemoryFileSystem::new(), |fs, name| {
            fs.with_file(format!("/p/{name}"), *name)
        });
    SessionController::new(ProjectContext::new("/p"), Arc::new(fs), Config::default())
}

proptest! {
    #[test]
    fn selection_stays_consistent(ops in prop::collection::vec(op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let mut session = new_session();

            for op in ops {
                let before = session.state();
                let selected_path = session
                    .selected_document()
                    .map(|d| d.path().to_path_buf());

                match op {
                    Op::Open(i) => {
                        session.open_document(FILES[i]).await.unwrap();
                    }
                    Op::Select(i) => {
                        let result = session.select_document(i);
                        prop_assert_eq!(result.is_ok(), i < before.documents.len());
                    }
                    Op::Close(i) => {
                        let ok = session.close_document(i).is_ok();
                        prop_assert_eq!(ok, i < before.documents.len());
                        // Closing another tab never moves the selection off its document
                        if ok && before.selected_index != Some(i) {
                            let now = session.selected_document().map(|d| d.path().to_path_buf());
                            prop_assert_eq!(now, selected_path);
                        }
                    }
                    Op::CloseOthers => session.close_others(),
                    Op::CloseAll => session.close_all(),
                    Op::Undo => {
                        let _ = session.undo();
                    }
                }

                let state = session.state();
                prop_assert_eq!(state.selected_index.is_some(), !state.documents.is_empty());
                if let Some(index) = state.selected_index {
                    prop_assert!(index < state.documents.len());
                }

                let mut paths: Vec<_> = state.documents.iter().map(|d| d.path.clone()).collect();
                paths.sort();
                paths.dedup();
                prop_assert_eq!(paths.len(), state.documents.len());
            }
            Ok(())
        })?;
    }
}
