//! Analysis, planning, test and quality tools backed by a
//! [`CodeIntelligenceProvider`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use super::{failure, Tool};
use crate::intelligence::{
    AnalysisRequest, CodeIntelligenceProvider, ImplementationRequest, QualityRequest, TestRequest,
};

fn parse<T: DeserializeOwned>(args: Value) -> anyhow::Result<T> {
    serde_json::from_value(args).map_err(|e| anyhow::anyhow!("Invalid arguments: {}", e))
}

/// `{"success": true, <key>: report}`, or a failure object.
fn respond<T: Serialize>(key: &str, result: anyhow::Result<T>) -> anyhow::Result<Value> {
    let report = match result.and_then(|r| Ok(serde_json::to_value(r)?)) {
        Ok(report) => report,
        Err(e) => return Ok(failure(e)),
    };
    Ok(json!({
        "success": true,
        key: report,
    }))
}

pub struct AnalyzeCodebase {
    provider: Arc<dyn CodeIntelligenceProvider>,
}

impl AnalyzeCodebase {
    pub fn new(provider: Arc<dyn CodeIntelligenceProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for AnalyzeCodebase {
    fn name(&self) -> &str {
        "analyzeCodebase"
    }

    fn description(&self) -> &str {
        "Analyze the codebase for a task: task type, complexity, affected areas and recommendations."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskDescription": { "type": "string" },
                "repositoryPath": { "type": "string" },
                "focusAreas": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["taskDescription"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let result = match parse::<AnalysisRequest>(args) {
            Ok(request) => self.provider.analyze_codebase(&request).await,
            Err(e) => Err(e),
        };
        respond("analysis", result)
    }
}

pub struct ImplementCodeChanges {
    provider: Arc<dyn CodeIntelligenceProvider>,
}

impl ImplementCodeChanges {
    pub fn new(provider: Arc<dyn CodeIntelligenceProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for ImplementCodeChanges {
    fn name(&self) -> &str {
        "implementCodeChanges"
    }

    fn description(&self) -> &str {
        "Produce an implementation plan for a task: ordered steps and the files to modify or create."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskDescription": { "type": "string" },
                "targetFiles": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["taskDescription"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let result = match parse::<ImplementationRequest>(args) {
            Ok(request) => self.provider.plan_implementation(&request).await,
            Err(e) => Err(e),
        };
        respond("plan", result)
    }
}

pub struct RunCodeTests {
    provider: Arc<dyn CodeIntelligenceProvider>,
}

impl RunCodeTests {
    pub fn new(provider: Arc<dyn CodeIntelligenceProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for RunCodeTests {
    fn name(&self) -> &str {
        "runCodeTests"
    }

    fn description(&self) -> &str {
        "Run the test suite (or the given test files) and report pass/fail counts."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repositoryPath": { "type": "string" },
                "testFiles": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "testCommand": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let result = match parse::<TestRequest>(args) {
            Ok(request) => self.provider.run_tests(&request).await,
            Err(e) => Err(e),
        };
        respond("testResults", result)
    }
}

pub struct ValidateCodeQuality {
    provider: Arc<dyn CodeIntelligenceProvider>,
}

impl ValidateCodeQuality {
    pub fn new(provider: Arc<dyn CodeIntelligenceProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for ValidateCodeQuality {
    fn name(&self) -> &str {
        "validateCodeQuality"
    }

    fn description(&self) -> &str {
        "Review files against coding standards and return a quality score with issues."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "files": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "standards": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let result = match parse::<QualityRequest>(args) {
            Ok(request) => self.provider.validate_quality(&request).await,
            Err(e) => Err(e),
        };
        respond("qualityReport", result)
    }
}
