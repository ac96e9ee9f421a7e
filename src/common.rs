use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;

/// Handlebars registry with the helpers every view can rely on
pub fn get_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();

    handlebars_helper!(exists: |v: Value| !v.is_null());
    handlebars.register_helper("exists", Box::new(exists));

    handlebars_helper!(isnull: |v: Value| v.is_null());
    handlebars.register_helper("isnull", Box::new(isnull));

    handlebars_helper!(stringeq: |s1: String, s2: String| s1.eq(&s2));
    handlebars.register_helper("stringeq", Box::new(stringeq));

    handlebars_helper!(json: |v: Value| v.to_string());
    handlebars.register_helper("json", Box::new(json));

    handlebars
}
