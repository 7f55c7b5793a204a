//! Demo provisioning path.
//!
//! Used when neither a pipeline nor a local Terraform is available: emits
//! the progress lines a real run would produce, without touching any cloud.

use eco_iac::{DeploymentId, Resource};

use crate::pipeline::PipelineAction;

/// Progress lines for a simulated run, in order.
pub fn demo_steps(
    resources: &[Resource],
    deployment_id: &DeploymentId,
    action: PipelineAction,
    estimated_cost: Option<f64>,
) -> Vec<String> {
    let count = resources.len();
    let names: Vec<String> = if resources.is_empty() {
        vec!["default-resource".to_string()]
    } else {
        resources.iter().map(Resource::label).collect()
    };

    let mut steps = vec![
        "Initializing Terraform...".to_string(),
        "Terraform init... OK".to_string(),
    ];

    match action {
        PipelineAction::Apply => {
            steps.push(format!("Plan: {} resource(s) to create", count));
            steps.push(format!("Terraform plan... OK (0 to change, {} to add)", count));
            steps.push("Terraform apply in progress...".to_string());
            for (i, name) in names.iter().enumerate() {
                steps.push(format!("Creating {}... {}%", name, progress(i, names.len())));
            }
            steps.push("Configuring networking and firewall rules...".to_string());
            steps.push(format!(
                "Apply complete! Resources: {} added, 0 changed, 0 destroyed.",
                count
            ));
            if let Some(cost) = estimated_cost {
                steps.push(format!("Estimated cost: {:.2} $/month", cost));
            }
            steps.push(format!("Deployment {} complete!", deployment_id));
        }
        PipelineAction::Destroy => {
            steps.push(format!("Plan: {} resource(s) to destroy", count));
            steps.push("Terraform destroy in progress...".to_string());
            for (i, name) in names.iter().enumerate() {
                steps.push(format!("Destroying {}... {}%", name, progress(i, names.len())));
            }
            steps.push(format!("Destroy complete! Resources: {} destroyed.", count));
            steps.push(format!("Destruction {} complete!", deployment_id));
        }
    }

    steps
}

/// Percentage shown after the `index`-th of `total` resources, from 10 to 90.
fn progress(index: usize, total: usize) -> usize {
    (index + 1) * 80 / total.max(1) + 10
}
