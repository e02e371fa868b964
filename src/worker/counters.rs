use serde::{Deserialize, Serialize};

/// Monotonic per-worker tallies. Single-threaded; owned by the event loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounters {
    pub messages_received: u64,
    pub vertices_added: u64,
    pub vertices_removed: u64,
    pub outgoing_edges_added: u64,
    pub outgoing_edges_removed: u64,
    pub signal_operations_executed: u64,
    pub collect_operations_executed: u64,
    pub signal_steps: u64,
    pub collect_steps: u64,
}

impl OperationCounters {
    pub fn statistics(
        &self,
        worker_id: u32,
        messages_sent: u64,
        num_vertices: u64,
        num_outgoing_edges: u64,
    ) -> WorkerStatistics {
        WorkerStatistics {
            worker_id,
            messages_sent,
            messages_received: self.messages_received,
            vertices_added: self.vertices_added,
            vertices_removed: self.vertices_removed,
            outgoing_edges_added: self.outgoing_edges_added,
            outgoing_edges_removed: self.outgoing_edges_removed,
            signal_operations_executed: self.signal_operations_executed,
            collect_operations_executed: self.collect_operations_executed,
            signal_steps: self.signal_steps,
            collect_steps: self.collect_steps,
            num_vertices,
            num_outgoing_edges,
        }
    }
}

/// On-demand snapshot of a worker: operation counters plus bus and store
/// totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatistics {
    pub worker_id: u32,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub vertices_added: u64,
    pub vertices_removed: u64,
    pub outgoing_edges_added: u64,
    pub outgoing_edges_removed: u64,
    pub signal_operations_executed: u64,
    pub collect_operations_executed: u64,
    pub signal_steps: u64,
    pub collect_steps: u64,
    pub num_vertices: u64,
    pub num_outgoing_edges: u64,
}

impl WorkerStatistics {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();
        let mut counter = |name: &str, help: &str, value: u64| {
            output.push_str(&format!("# HELP farol_{name} {help}\n"));
            output.push_str(&format!("# TYPE farol_{name} counter\n"));
            output.push_str(&format!(
                "farol_{name}{{worker=\"{}\"}} {value}\n",
                self.worker_id
            ));
        };
        counter("messages_sent", "Messages sent via the bus", self.messages_sent);
        counter(
            "messages_received",
            "Messages drained from the inbox",
            self.messages_received,
        );
        counter("vertices_added", "Vertices added to the shard", self.vertices_added);
        counter(
            "vertices_removed",
            "Vertices removed from the shard",
            self.vertices_removed,
        );
        counter(
            "outgoing_edges_added",
            "Outgoing edges added",
            self.outgoing_edges_added,
        );
        counter(
            "outgoing_edges_removed",
            "Outgoing edges removed",
            self.outgoing_edges_removed,
        );
        counter(
            "signal_operations_executed",
            "Signal operations executed",
            self.signal_operations_executed,
        );
        counter(
            "collect_operations_executed",
            "Collect operations executed",
            self.collect_operations_executed,
        );
        counter("signal_steps", "Explicit signal steps", self.signal_steps);
        counter("collect_steps", "Explicit collect steps", self.collect_steps);
        drop(counter);

        output.push_str(&format!(
            "# HELP farol_num_vertices Vertices resident in the shard\n# TYPE farol_num_vertices gauge\nfarol_num_vertices{{worker=\"{}\"}} {}\n",
            self.worker_id, self.num_vertices
        ));
        output.push_str(&format!(
            "# HELP farol_num_outgoing_edges Outgoing edges resident in the shard\n# TYPE farol_num_outgoing_edges gauge\nfarol_num_outgoing_edges{{worker=\"{}\"}} {}\n",
            self.worker_id, self.num_outgoing_edges
        ));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_merge_counters_and_totals() {
        let counters = OperationCounters {
            messages_received: 7,
            vertices_added: 3,
            ..Default::default()
        };
        let stats = counters.statistics(2, 11, 3, 4);
        assert_eq!(stats.worker_id, 2);
        assert_eq!(stats.messages_sent, 11);
        assert_eq!(stats.messages_received, 7);
        assert_eq!(stats.num_vertices, 3);
        assert_eq!(stats.num_outgoing_edges, 4);
    }

    #[test]
    fn prometheus_export_names_every_series() {
        let stats = OperationCounters::default().statistics(0, 0, 0, 0);
        let text = stats.to_prometheus_format();
        assert!(text.contains("farol_messages_sent{worker=\"0\"} 0"));
        assert!(text.contains("# TYPE farol_num_vertices gauge"));
    }

    #[test]
    fn json_round_trip() {
        let stats = OperationCounters::default().statistics(1, 5, 2, 2);
        let json = stats.to_json().expect("serialize");
        let parsed: WorkerStatistics = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, stats);
    }
}
