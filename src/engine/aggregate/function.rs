use std::fmt;

/// Aggregates whose partial states can be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Uniq,
    Sum,
    Avg,
    Count,
}

impl AggregateFunction {
    pub const ALL: [AggregateFunction; 4] = [
        AggregateFunction::Uniq,
        AggregateFunction::Sum,
        AggregateFunction::Avg,
        AggregateFunction::Count,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Uniq => "uniq",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Count => "count",
        }
    }
}

/// Where in the partial-aggregation lifecycle a call sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateStage {
    /// `uniq(x)`: input rows to a final scalar.
    Direct,
    /// `uniqState(x)`: input rows to a mergeable state.
    State,
    /// `uniqMerge(s)`: states to a final scalar.
    Merge,
}

/// A parsed aggregate call name such as `countIfState` or `uniqMergeIf`.
///
/// For `Direct` and `State` the `conditional` flag is the `If` applied to input rows.
/// For `Merge` it is the `MergeIf` form, which filters the states being merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateName {
    pub function: AggregateFunction,
    pub conditional: bool,
    pub stage: AggregateStage,
}

impl AggregateName {
    pub fn new(function: AggregateFunction, conditional: bool, stage: AggregateStage) -> Self {
        Self {
            function,
            conditional,
            stage,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        AggregateFunction::ALL.iter().find_map(|&function| {
            let rest = name.strip_prefix(function.as_str())?;
            let (conditional, stage) = match rest {
                "" => (false, AggregateStage::Direct),
                "If" => (true, AggregateStage::Direct),
                "State" => (false, AggregateStage::State),
                "IfState" => (true, AggregateStage::State),
                "Merge" => (false, AggregateStage::Merge),
                "MergeIf" => (true, AggregateStage::Merge),
                _ => return None,
            };
            Some(Self::new(function, conditional, stage))
        })
    }

    pub fn with_stage(self, stage: AggregateStage) -> Self {
        Self { stage, ..self }
    }

    /// The merge call for a column holding states of this aggregate. Row-level `If`
    /// is already baked into the state, so the merge is unconditional unless asked.
    pub fn merge(function: AggregateFunction, conditional: bool) -> Self {
        Self::new(function, conditional, AggregateStage::Merge)
    }
}

impl fmt::Display for AggregateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.function.as_str();
        let cond = if self.conditional { "If" } else { "" };
        match self.stage {
            AggregateStage::Direct => write!(f, "{base}{cond}"),
            AggregateStage::State => write!(f, "{base}{cond}State"),
            AggregateStage::Merge => write!(f, "{base}Merge{cond}"),
        }
    }
}
