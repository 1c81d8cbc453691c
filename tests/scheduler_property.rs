// tests/scheduler_property.rs

use std::collections::HashSet;

use assetflow::config::ConfigFile;
use assetflow::dag::Scheduler;
use assetflow::engine::TaskOutcome;
use assetflow_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use proptest::prelude::*;

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_config_strategy(max_tasks: usize) -> impl Strategy<Value = ConfigFile> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );

        deps_strat.prop_map(move |raw_deps| {
            let mut builder = ConfigFileBuilder::new();
            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                let name = format!("task_{i}");
                let mut task_builder = TaskConfigBuilder::group();

                let mut valid_deps = HashSet::new();
                for dep_idx in potential_deps {
                    if i > 0 {
                        valid_deps.insert(dep_idx % i);
                    }
                }
                for dep_idx in valid_deps {
                    task_builder = task_builder.after(&format!("task_{dep_idx}"));
                }
                builder = builder.with_task(&name, task_builder.build());
            }
            builder.build()
        })
    })
}

proptest! {
    #[test]
    fn every_run_terminates_and_dispatches_each_task_at_most_once(
        cfg in dag_config_strategy(10),
        triggers in proptest::collection::vec(0..10usize, 1..5),
        failing in proptest::collection::vec(0..10usize, 0..3),
    ) {
        let mut scheduler = Scheduler::from_registry(cfg.registry());
        let task_names: Vec<String> = scheduler.task_names().map(str::to_string).collect();

        let triggers: Vec<String> = triggers
            .iter()
            .filter(|&&i| i < task_names.len())
            .map(|&i| task_names[i].clone())
            .collect();
        prop_assume!(!triggers.is_empty());

        let failing: HashSet<String> = failing
            .iter()
            .filter(|&&i| i < task_names.len())
            .map(|&i| task_names[i].clone())
            .collect();

        scheduler.start_new_run();
        let mut executing: Vec<String> = Vec::new();
        let mut dispatched: HashSet<String> = HashSet::new();

        for t in &triggers {
            for st in scheduler.handle_trigger(t) {
                prop_assert!(dispatched.insert(st.name.clone()), "{} dispatched twice", st.name);
                executing.push(st.name);
            }
        }

        let mut steps = 0;
        while let Some(task) = executing.pop() {
            steps += 1;
            prop_assert!(steps < 1000, "simulation did not converge");

            let outcome = if failing.contains(&task) {
                TaskOutcome::Failed(format!("{task} failed"))
            } else {
                TaskOutcome::Success
            };
            for st in scheduler.handle_completion(&task, &outcome) {
                prop_assert!(dispatched.insert(st.name.clone()), "{} dispatched twice", st.name);
                executing.push(st.name);
            }
        }

        prop_assert!(scheduler.is_idle(), "run still active after all tasks completed");

        // Nothing starts after the first failure, so no failing task can be
        // dispatched once another has failed; and without failures every
        // target ran.
        if failing.iter().all(|f| !dispatched.contains(f)) {
            for t in &triggers {
                prop_assert!(dispatched.contains(t), "{} never ran", t);
            }
        }
    }
}
