//! End-to-end analysis
//!
//! Source and input flow one way: parse, bind inputs, trace, then mine
//! invariants and estimate complexity from the finished trace. The first
//! error from any stage ends the request; nothing partial is returned.

mod input;

pub use input::{input_size, parse_inputs};

use crate::ast::{Language, Program};
use crate::complexity::{estimate_complexity, SizedTrace, SpaceComplexity, TimeComplexity};
use crate::error::{AnalysisError, Result};
use crate::interp::{self, ErrorKind, Limits, Resource};
use crate::invariant::{
    infer_loop_invariants, infer_recursion_invariants, LoopInvariant, RecursionInvariant,
};
use crate::parser::parse;
use crate::trace::{Trace, TraceStep};
use serde::{Deserialize, Serialize};

/// Everything one successful analysis produces
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub trace: Vec<TraceStep>,
    pub loop_invariants: Vec<LoopInvariant>,
    pub recursion_invariants: Vec<RecursionInvariant>,
    pub time_complexity: TimeComplexity,
    pub space_complexity: SpaceComplexity,
}

/// Analyse `source` with the default limits
pub fn analyze(source: &str, input: &str, language: Language) -> Result<AnalysisResult> {
    analyze_with_limits(source, input, language, Limits::default())
}

pub fn analyze_with_limits(
    source: &str,
    input: &str,
    language: Language,
    limits: Limits,
) -> Result<AnalysisResult> {
    Analysis::new(source, language, limits)?.run(input, &[])
}

/// A parsed program ready to be traced against one or more inputs
pub struct Analysis {
    program: Program,
    limits: Limits,
}

impl Analysis {
    pub fn new(source: &str, language: Language, limits: Limits) -> Result<Self> {
        Ok(Analysis {
            program: parse(source, language)?,
            limits,
        })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Trace the program once against `input`
    pub fn trace(&self, input: &str) -> Result<Trace> {
        let inputs = parse_inputs(input, self.program.language)?;
        Ok(interp::trace(&self.program, &inputs, self.limits)?)
    }

    /// Full pipeline on `input`. Each entry of `scaling` is traced as well
    /// to feed the empirical side of the complexity estimate; runs that
    /// fail there only lose their sample.
    pub fn run(&self, input: &str, scaling: &[String]) -> Result<AnalysisResult> {
        let inputs = parse_inputs(input, self.program.language)?;
        let trace = interp::trace(&self.program, &inputs, self.limits)?;
        log::debug!("traced {} step(s)", trace.len());

        let loop_invariants = infer_loop_invariants(&trace, &self.program);
        let recursion_invariants = infer_recursion_invariants(&trace, &self.program);

        let mut samples = vec![sample(&trace, input_size(&inputs))];
        for text in scaling {
            match self.sample(text) {
                Ok(s) => samples.push(s),
                Err(e) => log::warn!("scaling input skipped: {e}"),
            }
        }
        let complexity = estimate_complexity(&self.program, &samples);

        Ok(AnalysisResult {
            trace: trace.steps().to_vec(),
            loop_invariants,
            recursion_invariants,
            time_complexity: complexity.time,
            space_complexity: complexity.space,
        })
    }

    fn sample(&self, input: &str) -> Result<SizedTrace> {
        let inputs = parse_inputs(input, self.program.language)?;
        let trace = interp::trace(&self.program, &inputs, self.limits)?;
        Ok(sample(&trace, input_size(&inputs)))
    }
}

fn sample(trace: &Trace, size: u64) -> SizedTrace {
    SizedTrace {
        size,
        steps: trace.len(),
        max_depth: trace.max_call_depth(),
    }
}

/// JSON request accepted by [`analyze_request`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub code: String,
    #[serde(default)]
    pub input: String,
    pub language: Language,
    #[serde(default)]
    pub limits: Option<Limits>,
    #[serde(default)]
    pub scaling_inputs: Vec<String>,
}

/// Structured failure: exactly one per failed request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisFailure {
    pub error_kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Stable tag of a runtime error, e.g. `index-out-of-bounds`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_kind: Option<ErrorKind>,
    /// Which ceiling a `resourceExceeded` failure hit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    pub message: String,
}

impl From<&AnalysisError> for AnalysisFailure {
    fn from(e: &AnalysisError) -> Self {
        AnalysisFailure {
            error_kind: e.kind(),
            line: e.line(),
            runtime_kind: match e {
                AnalysisError::Runtime(e) => Some(e.kind),
                _ => None,
            },
            resource: match e {
                AnalysisError::ResourceExceeded(e) => Some(e.resource),
                _ => None,
            },
            message: e.message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResponse {
    Success(Box<AnalysisResult>),
    Failure(AnalysisFailure),
}

impl AnalysisResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResponse::Success(_))
    }
}

pub fn analyze_request(request: &AnalysisRequest) -> AnalysisResponse {
    let limits = request.limits.unwrap_or_default();
    let outcome = Analysis::new(&request.code, request.language, limits)
        .and_then(|analysis| analysis.run(&request.input, &request.scaling_inputs));
    match outcome {
        Ok(result) => AnalysisResponse::Success(Box::new(result)),
        Err(e) => {
            log::debug!("request failed: {e}");
            AnalysisResponse::Failure(AnalysisFailure::from(&e))
        }
    }
}
