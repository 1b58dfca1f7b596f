use std::collections::HashSet;

use callgraph_state::{CallId, CallLinkStore};

use crate::domain::{GraphError, GraphResult};

/// Read back the execution chain of a contract, starting after its root.
///
/// When the contract's own id was registered as a call, the chain ends on
/// it and it is returned as the last element.
pub async fn walk_execution_chain(
    links: &dyn CallLinkStore,
    contract_id: &CallId,
) -> GraphResult<Vec<CallId>> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut current = contract_id.clone();

    while let Some(next) = links.next(&current).await? {
        if &next == contract_id {
            order.push(next);
            break;
        }
        if !visited.insert(next.clone()) {
            return Err(GraphError::integrity(
                &next,
                "execution chain visits this call twice",
            ));
        }
        order.push(next.clone());
        current = next;
    }

    Ok(order)
}
