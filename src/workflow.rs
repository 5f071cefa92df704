//! Static workflow tables for each instrument variant
//!
//! A [`Workflow`] is plain data: the state set, the creation operation, the
//! directed edges and their ownership rules. Nothing here mutates a record,
//! that is the job of [`crate::engine`].

/// A single `(from, operation) -> to` edge.
#[derive(Debug, PartialEq, Eq)]
pub struct Edge {
    pub from: &'static str,
    pub operation: &'static str,
    pub to: &'static str,
    pub transfers_ownership: bool,
    /// Business arguments recorded as attributes, the timestamp is last.
    pub arguments: &'static [&'static str],
}

/// The operation that enters the initial state.
#[derive(Debug, PartialEq, Eq)]
pub struct Creation {
    pub operation: &'static str,
    pub arguments: &'static [&'static str],
}

/// Terminal operation returning the instrument to its issuer.
#[derive(Debug, PartialEq, Eq)]
pub struct Redemption {
    pub operation: &'static str,
    pub from: &'static str,
    pub to: &'static str,
    pub arguments: &'static [&'static str],
}

#[derive(Debug, PartialEq, Eq)]
pub struct Workflow {
    pub kind: &'static str,
    pub name: &'static str,
    pub identity_fields: &'static [&'static str],
    pub states: &'static [&'static str],
    pub initial: &'static str,
    pub creation: Creation,
    pub edges: &'static [Edge],
    pub redemption: Option<Redemption>,
    /// Operation that keeps following its own edges within one invocation.
    pub chained_operation: Option<&'static str>,
}

/// How an operation is invoked, independent of the record's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Create {
        arguments: &'static [&'static str],
    },
    Transition {
        transfers_ownership: bool,
        arguments: &'static [&'static str],
    },
    Redeem {
        arguments: &'static [&'static str],
    },
}

impl Signature {
    pub fn arguments(&self) -> &'static [&'static str] {
        match self {
            Signature::Create { arguments }
            | Signature::Transition { arguments, .. }
            | Signature::Redeem { arguments } => arguments,
        }
    }
}

const PAPER_IDENTITY: &[&str] = &["issuer", "paperNumber"];

pub static LETTER_OF_CREDIT: Workflow = Workflow {
    kind: "org.papernet.letterofcredit",
    name: "letter-of-credit",
    identity_fields: PAPER_IDENTITY,
    states: &[
        "ISSUED",
        "APPROVED",
        "CONFIRMED",
        "ADD_SHIPPING",
        "CONFIRMED_SHIPPING",
        "PAID_TO_ADVISING",
        "PAID_TO_ISSUING",
    ],
    initial: "ISSUED",
    creation: Creation {
        operation: "issue",
        arguments: &["issueDateTime", "value"],
    },
    edges: &[
        Edge {
            from: "ISSUED",
            operation: "approve",
            to: "APPROVED",
            transfers_ownership: false,
            arguments: &["approvedDateTime"],
        },
        Edge {
            from: "APPROVED",
            operation: "confirm",
            to: "CONFIRMED",
            transfers_ownership: false,
            arguments: &["confirmDateTime"],
        },
        Edge {
            from: "CONFIRMED",
            operation: "addShipping",
            to: "ADD_SHIPPING",
            transfers_ownership: true,
            arguments: &["shippingDoc", "addShippingDateTime"],
        },
        Edge {
            from: "ADD_SHIPPING",
            operation: "confirmShipping",
            to: "CONFIRMED_SHIPPING",
            transfers_ownership: true,
            arguments: &["confirmedShippingDateTime"],
        },
        Edge {
            from: "CONFIRMED_SHIPPING",
            operation: "fund",
            to: "PAID_TO_ADVISING",
            transfers_ownership: true,
            arguments: &["fundAmount", "fundDateTime"],
        },
        Edge {
            from: "PAID_TO_ADVISING",
            operation: "pay",
            to: "PAID_TO_ISSUING",
            transfers_ownership: true,
            arguments: &["payAmount", "payDateTime"],
        },
    ],
    redemption: None,
    chained_operation: None,
};

pub static BUYER_FINANCING: Workflow = Workflow {
    kind: "org.papernet.commercialpaper",
    name: "buyer-supply-chain-financing",
    identity_fields: PAPER_IDENTITY,
    states: &[
        "PURCHASE",
        "INVOICE",
        "REQUEST",
        "STATEMENT",
        "CONFIRM",
        "FUNDING",
        "STATUS",
        "COLLECT",
        "PAYMENT",
    ],
    initial: "PURCHASE",
    creation: Creation {
        operation: "purchase",
        arguments: &["issueDateTime", "quantity"],
    },
    edges: &[
        Edge {
            from: "PURCHASE",
            operation: "invoice",
            to: "INVOICE",
            transfers_ownership: true,
            arguments: &["price", "invoiceDateTime"],
        },
        Edge {
            from: "INVOICE",
            operation: "request",
            to: "REQUEST",
            transfers_ownership: true,
            arguments: &["amount", "requestDateTime"],
        },
        Edge {
            from: "REQUEST",
            operation: "statement",
            to: "STATEMENT",
            transfers_ownership: true,
            arguments: &["statement", "statementDateTime"],
        },
        Edge {
            from: "STATEMENT",
            operation: "confirm",
            to: "CONFIRM",
            transfers_ownership: true,
            arguments: &["confirm", "confirmDateTime"],
        },
        Edge {
            from: "CONFIRM",
            operation: "funding",
            to: "FUNDING",
            transfers_ownership: true,
            arguments: &["fund", "discount", "fundDateTime"],
        },
        Edge {
            from: "FUNDING",
            operation: "status",
            to: "STATUS",
            transfers_ownership: true,
            arguments: &["status", "statusDateTime"],
        },
        Edge {
            from: "STATUS",
            operation: "collect",
            to: "COLLECT",
            transfers_ownership: true,
            arguments: &["collect", "collectDateTime"],
        },
    ],
    redemption: Some(Redemption {
        operation: "payment",
        from: "COLLECT",
        to: "PAYMENT",
        arguments: &["payment", "paymentDateTime"],
    }),
    chained_operation: None,
};

// `paid` advances two edges in one call: CONFIRMED_SHIPPING -> PAID_TO_ADVISING -> PAID_TO_ISSUING.
pub static IMPORTER_LETTER_OF_CREDIT: Workflow = Workflow {
    kind: "org.papernet.importerletterofcredit",
    name: "importer-letter-of-credit",
    identity_fields: PAPER_IDENTITY,
    states: &[
        "ISSUED",
        "APPROVED",
        "CONFIRMED",
        "ADD_SHIPPING",
        "CONFIRMED_SHIPPING",
        "PAID_TO_ADVISING",
        "PAID_TO_ISSUING",
    ],
    initial: "ISSUED",
    creation: Creation {
        operation: "issue",
        arguments: &["issueDateTime", "value"],
    },
    edges: &[
        Edge {
            from: "ISSUED",
            operation: "approve",
            to: "APPROVED",
            transfers_ownership: false,
            arguments: &["approvedDateTime"],
        },
        Edge {
            from: "APPROVED",
            operation: "confirm",
            to: "CONFIRMED",
            transfers_ownership: false,
            arguments: &["confirmDateTime"],
        },
        Edge {
            from: "CONFIRMED",
            operation: "addShipping",
            to: "ADD_SHIPPING",
            transfers_ownership: true,
            arguments: &["shippingDoc", "addShippingDateTime"],
        },
        Edge {
            from: "ADD_SHIPPING",
            operation: "confirmedShipping",
            to: "CONFIRMED_SHIPPING",
            transfers_ownership: true,
            arguments: &["confirmedShippingDateTime"],
        },
        Edge {
            from: "CONFIRMED_SHIPPING",
            operation: "paid",
            to: "PAID_TO_ADVISING",
            transfers_ownership: true,
            arguments: &["price", "paidDateTime"],
        },
        Edge {
            from: "PAID_TO_ADVISING",
            operation: "paid",
            to: "PAID_TO_ISSUING",
            transfers_ownership: true,
            arguments: &["price", "paidDateTime"],
        },
    ],
    redemption: None,
    chained_operation: Some("paid"),
};

pub static WORKFLOWS: [&Workflow; 3] = [
    &LETTER_OF_CREDIT,
    &BUYER_FINANCING,
    &IMPORTER_LETTER_OF_CREDIT,
];

/// Find the workflow governing records of `kind`.
pub fn lookup(kind: &str) -> Option<&'static Workflow> {
    WORKFLOWS.iter().copied().find(|wf| wf.kind == kind)
}

impl Workflow {
    pub fn has_state(&self, state: &str) -> bool {
        self.states.contains(&state)
    }

    pub fn edge(&self, from: &str, operation: &str) -> Option<&'static Edge> {
        self.edges
            .iter()
            .find(|edge| edge.from == from && edge.operation == operation)
    }

    /// States with no outgoing edge and no redemption leaving them.
    pub fn is_terminal(&self, state: &str) -> bool {
        let leaves_by_edge = self.edges.iter().any(|edge| edge.from == state);
        let leaves_by_redemption = self
            .redemption
            .as_ref()
            .is_some_and(|redemption| redemption.from == state);

        !leaves_by_edge && !leaves_by_redemption
    }

    pub fn is_redemption(&self, operation: &str) -> bool {
        self.redemption
            .as_ref()
            .is_some_and(|redemption| redemption.operation == operation)
    }

    pub fn is_chained(&self, operation: &str) -> bool {
        self.chained_operation == Some(operation)
    }

    /// Every operation name this workflow understands, creation first.
    pub fn operations(&self) -> Vec<&'static str> {
        let mut ops = vec![self.creation.operation];
        for edge in self.edges {
            if !ops.contains(&edge.operation) {
                ops.push(edge.operation);
            }
        }
        if let Some(redemption) = &self.redemption {
            ops.push(redemption.operation);
        }
        ops
    }

    /// Argument shape of `operation`; edges sharing an operation share a shape.
    pub fn signature(&self, operation: &str) -> Option<Signature> {
        if self.creation.operation == operation {
            return Some(Signature::Create {
                arguments: self.creation.arguments,
            });
        }
        if let Some(redemption) = self
            .redemption
            .as_ref()
            .filter(|redemption| redemption.operation == operation)
        {
            return Some(Signature::Redeem {
                arguments: redemption.arguments,
            });
        }
        self.edges
            .iter()
            .find(|edge| edge.operation == operation)
            .map(|edge| Signature::Transition {
                transfers_ownership: edge.transfers_ownership,
                arguments: edge.arguments,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_kind() {
        for wf in WORKFLOWS {
            assert_eq!(lookup(wf.kind), Some(wf));
        }
        assert!(lookup("org.papernet.unknown").is_none());
    }

    #[test]
    fn edges_stay_inside_the_state_set() {
        for wf in WORKFLOWS {
            assert!(wf.has_state(wf.initial), "{}", wf.name);
            for edge in wf.edges {
                assert!(wf.has_state(edge.from), "{} {:?}", wf.name, edge);
                assert!(wf.has_state(edge.to), "{} {:?}", wf.name, edge);
                assert_ne!(edge.from, edge.to, "{} {:?}", wf.name, edge);
            }
            if let Some(redemption) = &wf.redemption {
                assert!(wf.has_state(redemption.from));
                assert!(wf.has_state(redemption.to));
            }
        }
    }

    #[test]
    fn edges_sharing_an_operation_share_a_signature() {
        for wf in WORKFLOWS {
            for edge in wf.edges {
                assert_eq!(
                    wf.signature(edge.operation),
                    Some(Signature::Transition {
                        transfers_ownership: edge.transfers_ownership,
                        arguments: edge.arguments,
                    }),
                    "{} {}",
                    wf.name,
                    edge.operation
                );
            }
        }
    }

    #[test]
    fn at_most_one_edge_per_state_and_operation() {
        for wf in WORKFLOWS {
            for (i, a) in wf.edges.iter().enumerate() {
                for b in &wf.edges[i + 1..] {
                    assert!(!(a.from == b.from && a.operation == b.operation));
                }
            }
        }
    }

    #[test]
    fn letter_of_credit_ownership_rules() {
        let wf = &LETTER_OF_CREDIT;
        assert!(!wf.edge("ISSUED", "approve").unwrap().transfers_ownership);
        assert!(!wf.edge("APPROVED", "confirm").unwrap().transfers_ownership);
        assert!(wf.edge("CONFIRMED", "addShipping").unwrap().transfers_ownership);
        assert!(wf.is_terminal("PAID_TO_ISSUING"));
        assert!(!wf.is_terminal("ISSUED"));
    }

    #[test]
    fn buyer_financing_terminates_in_payment() {
        let wf = &BUYER_FINANCING;
        assert!(wf.edges.iter().all(|edge| edge.transfers_ownership));
        assert!(wf.is_redemption("payment"));
        assert!(wf.is_terminal("PAYMENT"));
        assert!(!wf.is_terminal("COLLECT"));
        assert_eq!(wf.operations().last(), Some(&"payment"));
    }

    #[test]
    fn importer_chains_paid() {
        let wf = &IMPORTER_LETTER_OF_CREDIT;
        assert!(wf.is_chained("paid"));
        assert!(!wf.is_chained("confirmedShipping"));
        assert_eq!(
            wf.operations(),
            vec!["issue", "approve", "confirm", "addShipping", "confirmedShipping", "paid"]
        );
    }
}
