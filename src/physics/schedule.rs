//! Pipeline stage ordering.
//!
//! The step is expressed as a DAG of named stages with explicit predecessor
//! lists, flattened once into a sequential execution order by a topological
//! sort. Running it single-threaded satisfies the same contract a task-graph
//! runtime would; only the partial order matters.

/// Every stage of one physics substep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// User fixed-timestep callback, before anything touches physics state.
    FixedLogic,
    UpdateProxyCache,
    UpdateManifolds,
    UpdateInertia,
    ApplyGravity,
    BroadPhase,
    NarrowPhasePhysics,
    NarrowPhaseTrigger,
    ConcavePhase,
    MergeContacts,
    GenerateContactConstraints,
    GenerateFreedomConstraints,
    UpdateJoints,
    ResolveConstraints,
    CacheImpulses,
    Integrate,
    NotifyEvents,
}

impl Stage {
    pub const ALL: [Stage; 17] = [
        Stage::FixedLogic,
        Stage::UpdateProxyCache,
        Stage::UpdateManifolds,
        Stage::UpdateInertia,
        Stage::ApplyGravity,
        Stage::BroadPhase,
        Stage::NarrowPhasePhysics,
        Stage::NarrowPhaseTrigger,
        Stage::ConcavePhase,
        Stage::MergeContacts,
        Stage::GenerateContactConstraints,
        Stage::GenerateFreedomConstraints,
        Stage::UpdateJoints,
        Stage::ResolveConstraints,
        Stage::CacheImpulses,
        Stage::Integrate,
        Stage::NotifyEvents,
    ];

    /// Stages that must complete before this one may run.
    pub fn predecessors(self) -> &'static [Stage] {
        use Stage::*;
        match self {
            FixedLogic => &[],
            UpdateProxyCache => &[FixedLogic],
            UpdateManifolds => &[FixedLogic],
            UpdateInertia => &[FixedLogic],
            ApplyGravity => &[FixedLogic],
            BroadPhase => &[UpdateProxyCache],
            NarrowPhasePhysics => &[BroadPhase],
            NarrowPhaseTrigger => &[BroadPhase],
            ConcavePhase => &[UpdateProxyCache],
            MergeContacts => &[NarrowPhasePhysics, ConcavePhase, UpdateManifolds],
            GenerateContactConstraints => &[MergeContacts, UpdateInertia, ApplyGravity],
            GenerateFreedomConstraints => &[UpdateInertia, ApplyGravity],
            UpdateJoints => &[UpdateInertia, ApplyGravity],
            ResolveConstraints => &[
                GenerateContactConstraints,
                GenerateFreedomConstraints,
                UpdateJoints,
            ],
            CacheImpulses => &[ResolveConstraints],
            Integrate => &[ResolveConstraints],
            NotifyEvents => &[CacheImpulses, Integrate, NarrowPhaseTrigger],
        }
    }

    fn ordinal(self) -> usize {
        Stage::ALL.iter().position(|&s| s == self).unwrap_or(0)
    }
}

/// A flattened, dependency-respecting execution order over all stages.
#[derive(Debug)]
pub struct Schedule {
    order: Vec<Stage>,
}

impl Schedule {
    /// Topologically sort the stage graph (Kahn's algorithm). Declaration
    /// order breaks ties, so the result is deterministic. The graph is a
    /// compile-time constant and acyclic by construction.
    pub fn build() -> Self {
        let n = Stage::ALL.len();
        let mut in_degree = [0usize; 17];
        for stage in Stage::ALL {
            in_degree[stage.ordinal()] = stage.predecessors().len();
        }

        let mut order = Vec::with_capacity(n);
        let mut done = [false; 17];
        while order.len() < n {
            let next = Stage::ALL
                .iter()
                .find(|s| !done[s.ordinal()] && in_degree[s.ordinal()] == 0)
                .copied();
            let Some(stage) = next else {
                debug_assert!(false, "stage graph contains a cycle");
                break;
            };
            done[stage.ordinal()] = true;
            order.push(stage);
            for successor in Stage::ALL {
                if successor.predecessors().contains(&stage) {
                    in_degree[successor.ordinal()] -= 1;
                }
            }
        }
        Self { order }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(order: &[Stage], stage: Stage) -> usize {
        order.iter().position(|&s| s == stage).unwrap()
    }

    #[test]
    fn test_schedule_contains_every_stage_once() {
        let schedule = Schedule::build();
        assert_eq!(schedule.stages().len(), Stage::ALL.len());
        for stage in Stage::ALL {
            assert_eq!(
                schedule.stages().iter().filter(|&&s| s == stage).count(),
                1,
                "{stage:?}"
            );
        }
    }

    #[test]
    fn test_schedule_respects_partial_order() {
        let schedule = Schedule::build();
        let order = schedule.stages();
        for stage in Stage::ALL {
            for &pred in stage.predecessors() {
                assert!(
                    position(order, pred) < position(order, stage),
                    "{pred:?} must run before {stage:?}"
                );
            }
        }
    }

    #[test]
    fn test_key_orderings() {
        let schedule = Schedule::build();
        let order = schedule.stages();
        assert_eq!(order[0], Stage::FixedLogic);
        assert_eq!(*order.last().unwrap(), Stage::NotifyEvents);
        assert!(position(order, Stage::BroadPhase) < position(order, Stage::NarrowPhasePhysics));
        assert!(position(order, Stage::MergeContacts) < position(order, Stage::ResolveConstraints));
        assert!(position(order, Stage::ResolveConstraints) < position(order, Stage::Integrate));
    }
}
