use colored::*;
use dynabridge_core::{
    CallError, ServiceError, Value, catalog::Catalog, grpc::GrpcServiceError,
    prost_reflect::DescriptorError,
};
use std::fmt::Display;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct ServiceList(pub Vec<String>);

pub struct OperationList<'a>(pub &'a Catalog);

pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<serde_json::Value> for FormattedString {
    fn from(value: serde_json::Value) -> Self {
        FormattedString(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
    }
}

impl From<Value> for FormattedString {
    fn from(value: Value) -> Self {
        FormattedString::from(serde_json::Value::from(value))
    }
}

impl From<ServiceError> for FormattedString {
    fn from(error: ServiceError) -> Self {
        let mut out = format!("{}", "Service Error:".red().bold());

        if let Value::Map(fields) = error.to_value() {
            // the stack trace spans several lines and is printed last
            for (key, value) in fields.into_iter().filter(|(key, _)| key != "stack-trace") {
                if let Some(text) = value.to_text() {
                    out.push_str(&format!("\n  {}: {}", key.yellow(), text));
                }
            }
        }

        if let Some(trace) = &error.stack_trace {
            out.push_str(&format!("\n\n{}", trace.dimmed()));
        }
        FormattedString(out)
    }
}

impl From<CallError> for FormattedString {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Service(record) => FormattedString::from(record),
            other => failure("Call Failed", other),
        }
    }
}

impl From<GrpcServiceError> for FormattedString {
    fn from(err: GrpcServiceError) -> Self {
        failure("Service Lookup Failed", err)
    }
}

impl From<DescriptorError> for FormattedString {
    fn from(err: DescriptorError) -> Self {
        failure("Invalid descriptor set", err)
    }
}

impl From<std::io::Error> for FormattedString {
    fn from(err: std::io::Error) -> Self {
        failure("Failed to read file", err)
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(title, err): GenericError<T>) -> Self {
        failure(title, err)
    }
}

fn failure(title: &str, err: impl Display) -> FormattedString {
    FormattedString(format!("{}:\n\n'{}'", title.red().bold(), err))
}

impl From<ServiceList> for FormattedString {
    fn from(ServiceList(services): ServiceList) -> Self {
        if services.is_empty() {
            return FormattedString("The descriptor set declares no service.".yellow().to_string());
        }

        let lines: Vec<String> = services
            .iter()
            .map(|service| format!("  - {}", service.green()))
            .collect();
        FormattedString(format!("Services:\n{}", lines.join("\n")))
    }
}

impl From<OperationList<'_>> for FormattedString {
    fn from(OperationList(catalog): OperationList<'_>) -> Self {
        if catalog.is_empty() {
            return FormattedString("No operations found.".yellow().to_string());
        }

        let mut out = format!(
            "{} {} {{\n",
            "service".cyan(),
            catalog.class_name().green()
        );

        for entry in catalog.entries() {
            out.push_str(&format!("  {}\n", entry.name.green().bold()));
            for overload in &entry.overloads {
                let params = overload
                    .params
                    .iter()
                    .map(|p| p.to_string().yellow().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                let output = overload
                    .output
                    .as_ref()
                    .map_or_else(|| "()".to_string(), ToString::to_string);

                out.push_str(&format!(
                    "    ({}) {} {}\n",
                    params,
                    "returns".cyan(),
                    output.yellow()
                ));
            }
        }
        out.push('}');
        FormattedString(out)
    }
}
