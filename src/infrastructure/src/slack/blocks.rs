//! Block Kit menus for the selection wizard.

use domain::entities::{WizardCommand, WizardStep};
use serde_json::{json, Value};

/// Slack rejects static selects with more options than this.
pub const MAX_OPTIONS: usize = 100;

const KUBERNETES_LOGO: &str =
    "https://raw.githubusercontent.com/kubernetes/kubernetes/master/logo/logo.png";
const ARGOCD_LOGO: &str =
    "https://raw.githubusercontent.com/argoproj/argo-cd/master/docs/assets/logo.png";

fn option(text: &str, value: &str) -> Value {
    json!({
        "text": { "type": "plain_text", "text": text },
        "value": value,
    })
}

fn select_menu(
    prompt: &str,
    placeholder: &str,
    options: Vec<Value>,
    step: WizardStep,
    accessory: Option<Value>,
) -> Value {
    let mut section = json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": prompt },
    });
    if let Some(accessory) = accessory {
        section["accessory"] = accessory;
    }
    json!([
        section,
        {
            "type": "actions",
            "elements": [{
                "type": "static_select",
                "placeholder": { "type": "plain_text", "text": placeholder },
                "options": options,
                "action_id": step.action_id(),
            }],
        }
    ])
}

fn image(url: &str, alt: &str) -> Value {
    json!({ "type": "image", "image_url": url, "alt_text": alt })
}

fn plain_options(values: &[String]) -> Vec<Value> {
    values
        .iter()
        .take(MAX_OPTIONS)
        .map(|v| option(v, v))
        .collect()
}

pub fn command_menu(user_id: &str) -> Value {
    let options = WizardCommand::ALL
        .iter()
        .map(|c| option(c.as_str(), c.as_str()))
        .collect();
    select_menu(
        &format!("\nHello <@{}>! Please select a command:\n\n", user_id),
        "Select a command",
        options,
        WizardStep::Command,
        Some(image(KUBERNETES_LOGO, "computer thumbnail")),
    )
}

pub fn sub_command_menu(command: WizardCommand) -> Value {
    let options = command
        .sub_commands()
        .iter()
        .map(|s| option(s, s))
        .collect();
    select_menu(
        "Please select a sub-command:",
        "Select a sub-command",
        options,
        WizardStep::SubCommand,
        None,
    )
}

pub fn namespace_menu(namespaces: &[String]) -> Value {
    select_menu(
        "Please select a namespace:",
        "Select a namespace",
        plain_options(namespaces),
        WizardStep::Namespace,
        None,
    )
}

pub fn pod_menu(pods: &[String]) -> Value {
    select_menu(
        "Please select a pod:",
        "Select a pod",
        plain_options(pods),
        WizardStep::Pod,
        None,
    )
}

pub fn deployment_menu(deployments: &[String]) -> Value {
    select_menu(
        "Please select a deployment:",
        "Select a deployment",
        plain_options(deployments),
        WizardStep::Deployment,
        None,
    )
}

pub fn application_menu(apps: &[String]) -> Value {
    select_menu(
        "🚀 Please select an ArgoCD application:",
        "Select an application",
        plain_options(apps),
        WizardStep::ArgoApp,
        Some(image(ARGOCD_LOGO, "ArgoCD logo")),
    )
}

pub fn revision_menu(revisions: &[String]) -> Value {
    let options = revisions
        .iter()
        .take(MAX_OPTIONS)
        .map(|r| option(&format!("Revision {}", r), r))
        .collect();
    select_menu(
        "🔄 Please select a revision to rollback to:",
        "Select a revision",
        options,
        WizardStep::ArgoRevision,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_menu_lists_every_command() {
        let blocks = command_menu("U123");
        assert!(blocks[0]["text"]["text"].as_str().unwrap().contains("<@U123>"));
        assert_eq!(blocks[0]["accessory"]["type"], "image");

        let select = &blocks[1]["elements"][0];
        assert_eq!(select["action_id"], "kubectl_command_select");
        let values: Vec<&str> = select["options"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["value"].as_str().unwrap())
            .collect();
        assert_eq!(values, vec!["get", "describe", "logs", "rollout restart", "argo"]);
    }

    #[test]
    fn test_sub_command_menu_follows_command() {
        let blocks = sub_command_menu(WizardCommand::Argo);
        let options = blocks[1]["elements"][0]["options"].as_array().unwrap();
        assert_eq!(options.len(), 3);
        assert!(blocks[0].get("accessory").is_none());
    }

    #[test]
    fn test_revision_labels() {
        let blocks = revision_menu(&["7".to_string()]);
        let opt = &blocks[1]["elements"][0]["options"][0];
        assert_eq!(opt["text"]["text"], "Revision 7");
        assert_eq!(opt["value"], "7");
        assert_eq!(blocks[1]["elements"][0]["action_id"], "argo_revision_select");
    }

    #[test]
    fn test_options_are_capped() {
        let many: Vec<String> = (0..150).map(|i| format!("pod-{}", i)).collect();
        let blocks = pod_menu(&many);
        assert_eq!(
            blocks[1]["elements"][0]["options"].as_array().unwrap().len(),
            MAX_OPTIONS
        );
    }
}
