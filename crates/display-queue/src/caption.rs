use crate::media::Context;

/// Renders a caption template against a context.
///
/// Every `${key}` whose key is present in `context` is replaced by its value.
/// Placeholders for keys that are not in `context` are left as written, and
/// substituted values are never scanned again.
pub fn interpolate(template: &str, context: &Context) -> String {
	if context.is_empty() || !template.contains("${") {
		return template.to_string();
	}

	let mut out = String::with_capacity(template.len());
	let mut rest = template;

	while let Some(start) = rest.find("${") {
		out.push_str(&rest[..start]);
		let after_open = &rest[start + 2..];

		let Some(end) = after_open.find('}') else {
			// unterminated placeholder
			out.push_str(&rest[start..]);
			return out;
		};

		let key = &after_open[..end];
		match context.get(key) {
			Some(value) => out.push_str(value),
			None => {
				out.push_str("${");
				out.push_str(key);
				out.push('}');
			}
		}
		rest = &after_open[end + 1..];
	}

	out.push_str(rest);
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ctx(pairs: &[(&str, &str)]) -> Context {
		pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
	}

	#[test]
	fn test_missing_keys_pass_through() {
		let out = interpolate("Hello ${user}, ${missing}!", &ctx(&[("user", "Alice")]));
		assert_eq!(out, "Hello Alice, ${missing}!");
	}

	#[test]
	fn test_every_occurrence_is_replaced() {
		let out = interpolate("${a}-${a}-${b}", &ctx(&[("a", "x"), ("b", "y")]));
		assert_eq!(out, "x-x-y");
	}

	#[test]
	fn test_empty_value_erases_placeholder() {
		let out = interpolate("[${user}]", &ctx(&[("user", "")]));
		assert_eq!(out, "[]");
	}

	#[test]
	fn test_no_recursive_substitution() {
		let out = interpolate("${a}", &ctx(&[("a", "${b}"), ("b", "nope")]));
		assert_eq!(out, "${b}");
	}

	#[test]
	fn test_unterminated_placeholder_is_kept() {
		let out = interpolate("cost: ${amount", &ctx(&[("amount", "5")]));
		assert_eq!(out, "cost: ${amount");
	}

	#[test]
	fn test_empty_context_returns_template() {
		assert_eq!(interpolate("${user}", &Context::new()), "${user}");
		assert_eq!(interpolate("", &ctx(&[("a", "b")])), "");
	}
}
