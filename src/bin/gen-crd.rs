use costatus::crd::clusteroperator::ClusterOperator;
use costatus::crd::csv::ClusterServiceVersion;
use kube::CustomResourceExt;
use serde_json::json;

fn main() -> anyhow::Result<()> {
    // CRDs for test clusters that lack OLM or the OpenShift config API.
    // Pipe through a JSON -> YAML converter if YAML is preferred; `kubectl
    // apply -f -` accepts the List as is.
    let list = json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": [
            serde_json::to_value(ClusterServiceVersion::crd())?,
            serde_json::to_value(ClusterOperator::crd())?,
        ],
    });

    println!("{}", serde_json::to_string_pretty(&list)?);
    Ok(())
}
