use ether_data::Value;

/// `{msg_id, service, no_ret, calls}` — validated on the way in, built on
/// the way out. Parsing never errors: a malformed request is dropped
/// silently per §4.6/§7, so [`CallRequest::from_value`] returns `None`
/// rather than a typed error.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub msg_id: [u8; 16],
    pub service: String,
    pub no_ret: bool,
    pub calls: Vec<(String, Value)>,
}

impl CallRequest {
    pub fn to_value(&self) -> Value {
        Value::map([
            ("msg_id", Value::Bytes(self.msg_id.to_vec())),
            ("service", Value::str(self.service.clone())),
            ("no_ret", Value::Bool(self.no_ret)),
            (
                "calls",
                Value::Array(
                    self.calls
                        .iter()
                        .map(|(name, args)| Value::Array(vec![Value::str(name.clone()), args.clone()]))
                        .collect(),
                ),
            ),
        ])
    }

    pub fn from_value(v: &Value) -> Option<Self> {
        let msg_id = v.get("msg_id")?.as_bytes()?;
        let msg_id: [u8; 16] = msg_id.try_into().ok()?;
        let service = v.get("service")?.as_str()?.to_owned();
        let no_ret = v.get("no_ret")?.as_bool()?;
        let calls_raw = v.get("calls")?.as_array()?;

        let mut calls = Vec::with_capacity(calls_raw.len());
        for entry in calls_raw {
            let pair = entry.as_array()?;
            if pair.len() != 2 {
                return None;
            }
            let func = pair[0].as_str()?.to_owned();
            calls.push((func, pair[1].clone()));
        }

        Some(CallRequest {
            msg_id,
            service,
            no_ret,
            calls,
        })
    }
}

/// `{msg_id, rets}` — one `(success, values)` pair per call in the
/// matching request, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CallReply {
    pub msg_id: [u8; 16],
    pub rets: Vec<(bool, Vec<Value>)>,
}

impl CallReply {
    pub fn to_value(&self) -> Value {
        Value::map([
            ("msg_id", Value::Bytes(self.msg_id.to_vec())),
            (
                "rets",
                Value::Array(
                    self.rets
                        .iter()
                        .map(|(success, values)| Value::Array(vec![Value::Bool(*success), Value::Array(values.clone())]))
                        .collect(),
                ),
            ),
        ])
    }

    pub fn from_value(v: &Value) -> Option<Self> {
        let msg_id = v.get("msg_id")?.as_bytes()?;
        let msg_id: [u8; 16] = msg_id.try_into().ok()?;
        let rets_raw = v.get("rets")?.as_array()?;

        let mut rets = Vec::with_capacity(rets_raw.len());
        for entry in rets_raw {
            let pair = entry.as_array()?;
            if pair.len() != 2 {
                return None;
            }
            let success = pair[0].as_bool()?;
            let values = pair[1].as_array()?.to_vec();
            rets.push((success, values));
        }

        Some(CallReply { msg_id, rets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_value() {
        let req = CallRequest {
            msg_id: [7; 16],
            service: "svc".into(),
            no_ret: false,
            calls: vec![("add".into(), Value::map([("a", Value::Int(1)), ("b", Value::Int(2))]))],
        };
        let v = req.to_value();
        assert_eq!(CallRequest::from_value(&v), Some(req));
    }

    #[test]
    fn malformed_request_missing_key_is_dropped() {
        let v = Value::map([("service", Value::str("svc"))]);
        assert_eq!(CallRequest::from_value(&v), None);
    }

    #[test]
    fn wrong_length_msg_id_is_dropped() {
        let v = Value::map([
            ("msg_id", Value::Bytes(vec![1, 2, 3])),
            ("service", Value::str("svc")),
            ("no_ret", Value::Bool(false)),
            ("calls", Value::Array(vec![])),
        ]);
        assert_eq!(CallRequest::from_value(&v), None);
    }

    #[test]
    fn reply_round_trips_through_value() {
        let reply = CallReply {
            msg_id: [9; 16],
            rets: vec![(true, vec![Value::Int(5)]), (false, vec![Value::str("ValueError"), Value::str("bad")])],
        };
        let v = reply.to_value();
        assert_eq!(CallReply::from_value(&v), Some(reply));
    }
}
