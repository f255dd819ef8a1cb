use tera::Tera;

pub const ORDER_CONFIRMATION: &str = "order_confirmation.txt";
pub const OPERATOR_ALERT: &str = "operator_alert.txt";

const ORDER_CONFIRMATION_BODY: &str = "\
Hello {{ customer_name }},

Thank you for shopping at {{ store_name }}. Your order {{ order_id }} has
been received.

{% for line in lines -%}
  {{ line.quantity }} x {{ line.product_name }} @ {{ line.unit_price }} {{ currency }} = {{ line.line_total }} {{ currency }}
{% endfor -%}
Total: {{ total }} {{ currency }}

We will call you on {{ phone }} to arrange delivery to:
{{ address }}
{% if notes %}
Your notes: {{ notes }}
{% endif %}";

const OPERATOR_ALERT_BODY: &str = "\
New order {{ order_id }} at {{ store_name }}.

Customer: {{ customer_name }} <{{ email }}>
Phone: {{ phone }}
Address: {{ address }}
{% if notes %}Notes: {{ notes }}
{% endif %}
{% for line in lines -%}
  {{ line.quantity }} x {{ line.product_name }} ({{ line.product_id }}) @ {{ line.unit_price }} {{ currency }}
{% endfor -%}
Total: {{ total }} {{ currency }}
";

/// Compile the built-in mail templates.
pub fn build_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template(ORDER_CONFIRMATION, ORDER_CONFIRMATION_BODY)?;
    tera.add_raw_template(OPERATOR_ALERT, OPERATOR_ALERT_BODY)?;
    Ok(tera)
}

#[cfg(test)]
mod tests {
    use tera::Context;

    use super::{build_templates, OPERATOR_ALERT, ORDER_CONFIRMATION};

    fn sample_context() -> Context {
        let mut ctx = Context::new();
        ctx.insert("store_name", "Shopfront");
        ctx.insert("order_id", "ORD-123456789abc");
        ctx.insert("customer_name", "Ama Mensah");
        ctx.insert("email", "ama@example.com");
        ctx.insert("phone", "024 123 4567");
        ctx.insert("address", "12 Ring Road, Accra");
        ctx.insert("notes", &Option::<String>::None);
        ctx.insert("currency", "USD");
        ctx.insert("total", "44.48");
        ctx.insert(
            "lines",
            &serde_json::json!([
                {
                    "product_id": "1",
                    "product_name": "Espresso Beans",
                    "quantity": 2,
                    "unit_price": "19.99",
                    "line_total": "39.98"
                }
            ]),
        );
        ctx
    }

    #[test]
    fn confirmation_template_renders_order_summary() {
        let tera = build_templates().expect("templates compile");
        let body = tera.render(ORDER_CONFIRMATION, &sample_context()).expect("render");

        assert!(body.contains("ORD-123456789abc"));
        assert!(body.contains("2 x Espresso Beans @ 19.99 USD = 39.98 USD"));
        assert!(body.contains("Total: 44.48 USD"));
        assert!(!body.contains("Your notes"), "empty notes block should be omitted");
    }

    #[test]
    fn operator_template_includes_contact_details() {
        let tera = build_templates().expect("templates compile");
        let body = tera.render(OPERATOR_ALERT, &sample_context()).expect("render");

        assert!(body.contains("Ama Mensah <ama@example.com>"));
        assert!(body.contains("12 Ring Road, Accra"));
    }
}
