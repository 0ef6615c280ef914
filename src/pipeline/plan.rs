use crate::config::{PipelineConfig, ResourceConfig};
use crate::constants::{CONVERT_STEP, FIT_STEP, TRANSFORM_STEP};
use crate::error::{PreflightError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Where a step argument comes from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepInput {
    /// Literal pipeline parameter
    Value { value: Value },
    /// Artifact produced by an earlier step
    Output { step: String, output: String },
}

impl StepInput {
    fn value(value: Value) -> Self {
        Self::Value { value }
    }

    fn output(step: &str, output: &str) -> Self {
        Self::Output {
            step: step.to_string(),
            output: output.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceLimits {
    pub cpu: String,
    pub memory: String,
    pub gpu: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSelector {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStep {
    pub name: String,
    pub inputs: BTreeMap<String, StepInput>,
    pub outputs: Vec<String>,
    pub resources: ResourceLimits,
    pub node_selector: NodeSelector,
}

impl PipelineStep {
    fn new(name: &str, resources: &ResourceConfig) -> Self {
        Self {
            name: name.to_string(),
            inputs: BTreeMap::new(),
            outputs: Vec::new(),
            resources: ResourceLimits {
                cpu: resources.cpu_limit.clone(),
                memory: resources.memory_limit.clone(),
                gpu: resources.gpu_limit.clone(),
            },
            node_selector: NodeSelector {
                label: resources.node_selector_label.clone(),
                value: resources.accelerator.clone(),
            },
        }
    }

    fn input(mut self, name: &str, input: StepInput) -> Self {
        self.inputs.insert(name.to_string(), input);
        self
    }

    fn output(mut self, name: &str) -> Self {
        self.outputs.push(name.to_string());
        self
    }

    /// Steps whose outputs this one consumes
    pub fn dependencies(&self) -> Vec<&str> {
        self.inputs
            .values()
            .filter_map(|input| match input {
                StepInput::Output { step, .. } => Some(step.as_str()),
                StepInput::Value { .. } => None,
            })
            .collect()
    }
}

/// Declarative description of one preprocessing run: CSV to Parquet
/// conversion, workflow fitting, then transformation
#[derive(Debug, Clone, Serialize)]
pub struct PipelinePlan {
    pub run_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub parameters: BTreeMap<String, Value>,
    pub steps: Vec<PipelineStep>,
}

impl PipelinePlan {
    pub fn build(pipeline: &PipelineConfig, resources: &ResourceConfig) -> Result<Self> {
        for (field, value) in [
            ("output_converted", &pipeline.output_converted),
            ("workflow_path", &pipeline.workflow_path),
            ("output_transformed", &pipeline.output_transformed),
        ] {
            if value.is_empty() {
                return Err(PreflightError::Config(format!("pipeline.{} is required", field)));
            }
        }

        let gpus = json!(pipeline.gpus);

        let convert = PipelineStep::new(CONVERT_STEP, resources)
            .input("train_paths", StepInput::value(json!(pipeline.train_paths)))
            .input("valid_paths", StepInput::value(json!(pipeline.valid_paths)))
            .input("output_converted", StepInput::value(json!(pipeline.output_converted)))
            .input("columns", StepInput::value(json!(pipeline.columns)))
            .input("cols_dtype", StepInput::value(json!(pipeline.cols_dtype)))
            .input("sep", StepInput::value(json!(pipeline.sep)))
            .input("gpus", StepInput::value(gpus.clone()))
            .output("output_datasets");

        let fit = PipelineStep::new(FIT_STEP, resources)
            .input("datasets", StepInput::output(CONVERT_STEP, "output_datasets"))
            .input("workflow_path", StepInput::value(json!(pipeline.workflow_path)))
            .input("gpus", StepInput::value(gpus.clone()))
            .output("fitted_workflow");

        let transform = PipelineStep::new(TRANSFORM_STEP, resources)
            .input("fitted_workflow", StepInput::output(FIT_STEP, "fitted_workflow"))
            .input("output_transformed", StepInput::value(json!(pipeline.output_transformed)))
            .input("gpus", StepInput::value(gpus));

        let mut parameters = BTreeMap::new();
        parameters.insert("shuffle".to_string(), json!(pipeline.shuffle));
        parameters.insert("recursive".to_string(), json!(pipeline.recursive));

        let plan = Self {
            run_id: Uuid::new_v4(),
            name: pipeline.name.clone(),
            created_at: Utc::now(),
            parameters,
            steps: vec![convert, fit, transform],
        };
        plan.check_dependencies()?;
        Ok(plan)
    }

    pub fn step(&self, name: &str) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // Every consumed output must come from an earlier step that declares it
    fn check_dependencies(&self) -> Result<()> {
        let mut produced: HashSet<(&str, &str)> = HashSet::new();
        for step in &self.steps {
            for input in step.inputs.values() {
                if let StepInput::Output { step: from, output } = input {
                    if !produced.contains(&(from.as_str(), output.as_str())) {
                        return Err(PreflightError::Config(format!(
                            "step '{}' consumes '{}.{}' before it is produced",
                            step.name, from, output
                        )));
                    }
                }
            }
            for output in &step.outputs {
                produced.insert((step.name.as_str(), output.as_str()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> PipelineConfig {
        PipelineConfig {
            train_paths: vec!["gs://bucket/train".to_string()],
            valid_paths: vec!["gs://bucket/valid".to_string()],
            output_converted: "gs://bucket/converted".to_string(),
            output_transformed: "gs://bucket/transformed".to_string(),
            workflow_path: "gs://bucket/workflow".to_string(),
            columns: vec!["label".to_string(), "I1".to_string()],
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_plan_has_three_chained_steps() {
        let plan = PipelinePlan::build(&pipeline(), &ResourceConfig::default()).unwrap();

        let names: Vec<&str> = plan.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["convert_csv_to_parquet", "fit_dataset", "transform_dataset"]);

        assert!(plan.step(CONVERT_STEP).unwrap().dependencies().is_empty());
        assert_eq!(plan.step(FIT_STEP).unwrap().dependencies(), vec![CONVERT_STEP]);
        assert_eq!(plan.step(TRANSFORM_STEP).unwrap().dependencies(), vec![FIT_STEP]);
    }

    #[test]
    fn test_every_step_gets_limits_and_node_selector() {
        let plan = PipelinePlan::build(&pipeline(), &ResourceConfig::default()).unwrap();
        for step in &plan.steps {
            assert_eq!(step.resources.cpu, "8");
            assert_eq!(step.resources.memory, "32G");
            assert_eq!(step.resources.gpu, "1");
            assert_eq!(step.node_selector.label, "cloud.google.com/gke-accelerator");
            assert_eq!(step.node_selector.value, "nvidia-tesla-t4");
        }
    }

    #[test]
    fn test_plan_serializes_inputs() {
        let plan = PipelinePlan::build(&pipeline(), &ResourceConfig::default()).unwrap();
        let value: Value = serde_json::from_str(&plan.to_json_pretty().unwrap()).unwrap();

        assert_eq!(value["name"], "nvt-gcs-pipeline");
        assert_eq!(value["parameters"]["shuffle"], "PER_PARTITION");
        let convert = &value["steps"][0]["inputs"];
        assert_eq!(convert["train_paths"]["kind"], "value");
        assert_eq!(convert["train_paths"]["value"][0], "gs://bucket/train");
        let fit = &value["steps"][1]["inputs"];
        assert_eq!(fit["datasets"]["kind"], "output");
        assert_eq!(fit["datasets"]["output"], "output_datasets");
    }

    #[test]
    fn test_missing_output_path_is_rejected() {
        let mut config = pipeline();
        config.workflow_path.clear();
        let err = PipelinePlan::build(&config, &ResourceConfig::default()).unwrap_err();
        assert!(matches!(err, PreflightError::Config(msg) if msg.contains("workflow_path")));
    }
}
