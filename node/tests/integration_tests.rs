//! End-to-end scenarios: several nodes on localhost UDP exchanging real
//! datagrams, checked through their contractual output files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use concord_node::Node;
use concord_types::{HostsTable, ProcessId, RunConfig, Tuning};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn hosts_for(ports: &[u16]) -> HostsTable {
    let lines: String = ports
        .iter()
        .enumerate()
        .map(|(i, port)| format!("{} 127.0.0.1 {}\n", i + 1, port))
        .collect();
    HostsTable::parse(&lines).expect("valid hosts")
}

fn fast_tuning() -> Tuning {
    Tuning {
        send_interval_ms: 5,
        log_interval_ms: 50,
        ..Tuning::default()
    }
}

struct TestCluster {
    nodes: Vec<Arc<Node>>,
    outputs: Vec<PathBuf>,
    runners: Vec<tokio::task::JoinHandle<()>>,
    _dir: tempfile::TempDir,
}

impl TestCluster {
    /// Start one node per entry of `configs` (node ids are 1-based).
    fn start(ports: &[u16], configs: Vec<RunConfig>) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let hosts = hosts_for(ports);

        let mut nodes = Vec::new();
        let mut outputs = Vec::new();
        let mut runners = Vec::new();
        for (i, config) in configs.into_iter().enumerate() {
            let id = (i + 1) as ProcessId;
            let output = dir.path().join(format!("proc{id}.output"));
            let node = Arc::new(
                Node::new(id, hosts.clone(), config, fast_tuning(), &output)
                    .expect("node construction"),
            );
            let runner = {
                let node = Arc::clone(&node);
                tokio::spawn(async move {
                    node.run().await.expect("node run");
                })
            };
            nodes.push(node);
            outputs.push(output);
            runners.push(runner);
        }
        Self {
            nodes,
            outputs,
            runners,
            _dir: dir,
        }
    }

    /// Poll the node's output until `predicate` holds, or panic after a
    /// generous timeout.
    async fn wait_for_output<F>(&self, node: usize, predicate: F) -> Vec<String>
    where
        F: Fn(&[String]) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
        loop {
            let lines = read_lines(&self.outputs[node]);
            if predicate(&lines) {
                return lines;
            }
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "timed out waiting on node {} output; last contents: {:?}",
                    node + 1,
                    lines
                );
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    async fn stop(self) -> Vec<Vec<String>> {
        for node in &self.nodes {
            node.shutdown_handle().shutdown();
        }
        for runner in self.runners {
            tokio::time::timeout(Duration::from_secs(10), runner)
                .await
                .expect("node should stop after shutdown")
                .expect("node task");
        }
        self.outputs.iter().map(|path| read_lines(path)).collect()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_owned)
        .collect()
}

fn broadcast_config(n: usize, total_messages: u32) -> Vec<RunConfig> {
    vec![RunConfig::Broadcast { total_messages }; n]
}

fn lattice_config(proposals_per_node: Vec<Vec<Vec<u32>>>) -> Vec<RunConfig> {
    proposals_per_node
        .into_iter()
        .map(|shots| RunConfig::Lattice {
            max_proposal_size: 8,
            distinct_values: 1024,
            proposals: shots
                .into_iter()
                .map(|values| values.into_iter().collect::<BTreeSet<u32>>())
                .collect(),
        })
        .collect()
}

/// Delivered sequence numbers for one origin, in log order.
fn deliveries_of(lines: &[String], origin: ProcessId) -> Vec<u32> {
    let prefix = format!("d {origin} ");
    lines
        .iter()
        .filter_map(|line| line.strip_prefix(&prefix))
        .map(|seq| seq.parse().expect("seq"))
        .collect()
}

fn decision_lines(lines: &[String]) -> Vec<BTreeSet<u32>> {
    lines
        .iter()
        .map(|line| {
            line.split_whitespace()
                .map(|v| v.parse().expect("decision value"))
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Broadcast mode
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn two_nodes_deliver_a_single_message() {
    let cluster = TestCluster::start(&[24101, 24102], broadcast_config(2, 1));

    for node in 0..2 {
        cluster
            .wait_for_output(node, |lines| {
                lines.contains(&"d 1 1".to_owned()) && lines.contains(&"d 2 1".to_owned())
            })
            .await;
    }

    let outputs = cluster.stop().await;
    for lines in &outputs {
        assert!(lines.contains(&"b 1".to_owned()));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn fifo_order_with_no_gaps_or_duplicates() {
    const TOTAL: u32 = 25;
    let cluster = TestCluster::start(&[24111, 24112], broadcast_config(2, TOTAL));

    for node in 0..2 {
        cluster
            .wait_for_output(node, |lines| {
                deliveries_of(lines, 1).len() == TOTAL as usize
                    && deliveries_of(lines, 2).len() == TOTAL as usize
            })
            .await;
    }

    let outputs = cluster.stop().await;
    let expected: Vec<u32> = (1..=TOTAL).collect();
    for lines in &outputs {
        for origin in [1, 2] {
            // exactly once each, strictly increasing, no gaps
            assert_eq!(deliveries_of(lines, origin), expected);
        }
        let broadcasts: Vec<&String> =
            lines.iter().filter(|l| l.starts_with("b ")).collect();
        assert_eq!(broadcasts.len(), TOTAL as usize);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn three_nodes_all_deliver_everything() {
    const TOTAL: u32 = 10;
    let cluster = TestCluster::start(&[24121, 24122, 24123], broadcast_config(3, TOTAL));

    for node in 0..3 {
        cluster
            .wait_for_output(node, |lines| {
                (1..=3).all(|origin| deliveries_of(lines, origin).len() == TOTAL as usize)
            })
            .await;
    }

    let outputs = cluster.stop().await;
    let expected: Vec<u32> = (1..=TOTAL).collect();
    for lines in &outputs {
        for origin in [1, 2, 3] {
            assert_eq!(deliveries_of(lines, origin), expected);
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn survivors_deliver_after_the_origin_stops() {
    const TOTAL: u32 = 5;
    let cluster = TestCluster::start(&[24161, 24162, 24163], broadcast_config(3, TOTAL));

    // wait until node 2 has everything node 1 originated, then stop
    // node 1: the survivors form a majority and keep relaying
    cluster
        .wait_for_output(1, |lines| deliveries_of(lines, 1).len() == TOTAL as usize)
        .await;
    cluster.nodes[0].shutdown_handle().shutdown();

    cluster
        .wait_for_output(2, |lines| deliveries_of(lines, 1).len() == TOTAL as usize)
        .await;

    let outputs = cluster.stop().await;
    let expected: Vec<u32> = (1..=TOTAL).collect();
    assert_eq!(deliveries_of(&outputs[1], 1), expected);
    assert_eq!(deliveries_of(&outputs[2], 1), expected);
}

// ---------------------------------------------------------------------------
// Lattice mode
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn identical_proposals_decide_identically() {
    let proposals = vec![
        vec![vec![1, 2, 3]],
        vec![vec![1, 2, 3]],
        vec![vec![1, 2, 3]],
    ];
    let cluster = TestCluster::start(&[24131, 24132, 24133], lattice_config(proposals));

    for node in 0..3 {
        cluster.wait_for_output(node, |lines| !lines.is_empty()).await;
    }

    let outputs = cluster.stop().await;
    for lines in &outputs {
        assert_eq!(lines, &vec!["1 2 3".to_owned()]);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn disjoint_proposals_decide_a_chain_of_supersets() {
    let proposals = vec![vec![vec![1]], vec![vec![2]], vec![vec![3]]];
    let cluster = TestCluster::start(&[24141, 24142, 24143], lattice_config(proposals));

    for node in 0..3 {
        cluster.wait_for_output(node, |lines| !lines.is_empty()).await;
    }

    let outputs = cluster.stop().await;
    let decisions: Vec<BTreeSet<u32>> = outputs
        .iter()
        .map(|lines| decision_lines(lines)[0].clone())
        .collect();

    // validity: each decision contains the proposer's own value
    for (i, decision) in decisions.iter().enumerate() {
        assert!(
            decision.contains(&((i + 1) as u32)),
            "node {} decision {decision:?} misses its own proposal",
            i + 1
        );
        assert!(decision.is_subset(&BTreeSet::from([1, 2, 3])));
    }

    // consistency: decisions are pairwise comparable under inclusion
    for a in &decisions {
        for b in &decisions {
            assert!(
                a.is_subset(b) || b.is_subset(a),
                "incomparable decisions {a:?} and {b:?}"
            );
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn two_shots_decide_in_shot_order() {
    // shot 0 draws from 1..=3, shot 1 from 101..=103: the value ranges
    // make the per-file ordering check unambiguous
    let proposals = vec![
        vec![vec![1], vec![101]],
        vec![vec![2], vec![102]],
        vec![vec![3], vec![103]],
    ];
    let cluster = TestCluster::start(&[24151, 24152, 24153], lattice_config(proposals));

    for node in 0..3 {
        cluster.wait_for_output(node, |lines| lines.len() == 2).await;
    }

    let outputs = cluster.stop().await;
    for (i, lines) in outputs.iter().enumerate() {
        let decisions = decision_lines(lines);
        assert_eq!(decisions.len(), 2, "node {} decided twice", i + 1);
        let own = (i + 1) as u32;
        assert!(decisions[0].contains(&own));
        assert!(decisions[0].iter().all(|v| *v <= 3));
        assert!(decisions[1].contains(&(own + 100)));
        assert!(decisions[1].iter().all(|v| *v > 100));
    }
}
