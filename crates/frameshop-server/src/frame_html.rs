use frameshop_config::FrameSettings;
use frameshop_contracts::{ButtonAction, ExplainState, Frame, FrameButton, Product};
use frameshop_kernel::{MatchReason, Recommendation, RuleMatch};
use reqwest::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDocument {
    pub image: String,
    pub buttons: Vec<FrameButton>,
    pub og_title: String,
    pub og_description: String,
    pub post_url: Option<String>,
    pub state: Option<ExplainState>,
}

impl FrameDocument {
    pub fn render(&self) -> String {
        let mut meta = vec![
            tag("og:title", &self.og_title),
            tag("og:description", &self.og_description),
            tag("og:image", &self.image),
            tag("fc:frame", "vNext"),
            tag("fc:frame:image", &self.image),
        ];
        if let Some(post_url) = &self.post_url {
            meta.push(tag("fc:frame:post_url", post_url));
        }
        for (idx, button) in self.buttons.iter().enumerate() {
            let n = idx + 1;
            meta.push(tag(&format!("fc:frame:button:{n}"), &button.label));
            meta.push(tag(
                &format!("fc:frame:button:{n}:action"),
                match button.action {
                    ButtonAction::Link => "link",
                    ButtonAction::Post => "post",
                },
            ));
            meta.push(tag(&format!("fc:frame:button:{n}:target"), &button.target));
        }
        if let Some(state) = &self.state {
            if let Ok(json) = serde_json::to_string(state) {
                meta.push(tag("fc:frame:state", &json));
            }
        }

        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\" />\n{}\n<title>{}</title>\n</head>\n<body></body>\n</html>\n",
            meta.join("\n"),
            escape(&self.og_title)
        )
    }
}

fn tag(property: &str, content: &str) -> String {
    format!(
        "<meta property=\"{}\" content=\"{}\" />",
        escape(property),
        escape(content)
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct FrameBuilder {
    settings: FrameSettings,
}

impl FrameBuilder {
    pub fn new(settings: FrameSettings) -> Self {
        Self { settings }
    }

    pub fn action_url(&self, frame_id: i64) -> String {
        format!("{}/api/frame/{frame_id}/action", self.settings.base_url)
    }

    pub fn explain_url(&self, frame_id: i64) -> String {
        format!("{}/api/frame/{frame_id}/explain", self.settings.base_url)
    }

    pub fn og_image(&self, title: &str, subtitle: &str, content: &str, image: &str) -> String {
        let base = format!("{}/api/og", self.settings.base_url);
        Url::parse_with_params(
            &base,
            &[
                ("title", title),
                ("subtitle", subtitle),
                ("content", content),
                ("url", image),
                ("width", "600"),
            ],
        )
        .map(|u| u.to_string())
        .unwrap_or_else(|_| image.to_string())
    }

    pub fn fallback(&self) -> FrameDocument {
        let fallback = &self.settings.fallback;
        FrameDocument {
            image: self.og_image(&self.settings.og_title, "", "", &fallback.image_url),
            buttons: vec![FrameButton {
                label: fallback.link_label.clone(),
                action: ButtonAction::Link,
                target: fallback.link_target.clone(),
            }],
            og_title: self.settings.og_title.clone(),
            og_description: self.settings.og_title.clone(),
            post_url: None,
            state: None,
        }
    }

    pub fn landing(&self, frame: &Frame) -> FrameDocument {
        FrameDocument {
            image: frame.image.clone(),
            buttons: vec![FrameButton {
                label: frame.button_label.clone(),
                action: ButtonAction::Post,
                target: self.action_url(frame.id),
            }],
            og_title: self.settings.og_title.clone(),
            og_description: frame.title.clone(),
            post_url: Some(self.action_url(frame.id)),
            state: None,
        }
    }

    pub fn recommendation(
        &self,
        frame: &Frame,
        recommendation: &Recommendation<'_>,
        explanation: Option<String>,
    ) -> FrameDocument {
        let product = recommendation.product;
        let image = match &recommendation.rule {
            RuleMatch::Matched {
                reason: MatchReason::Running,
                ..
            } => self.og_image(
                "Congrats on your +10th run!",
                "You're now eligible to buy:",
                &product.title,
                &product.image,
            ),
            _ => self.product_image(product),
        };

        let mut buttons = vec![FrameButton {
            label: "View".to_string(),
            action: ButtonAction::Link,
            target: format!("https://{}/products/{}", frame.shop, product.handle),
        }];
        if let Some(variant_id) = product.variant_id.as_deref().filter(|v| !v.is_empty()) {
            buttons.push(FrameButton {
                label: "Buy".to_string(),
                action: ButtonAction::Link,
                target: format!("https://{}/cart/{variant_id}:1", frame.shop),
            });
        }
        if explanation.is_some() {
            buttons.push(FrameButton {
                label: "Explain".to_string(),
                action: ButtonAction::Post,
                target: self.explain_url(frame.id),
            });
        }

        FrameDocument {
            image,
            buttons,
            og_title: self.settings.og_title.clone(),
            og_description: product.title.clone(),
            post_url: Some(self.action_url(frame.id)),
            state: explanation.map(|description| ExplainState { description }),
        }
    }

    pub fn explanation(&self, frame: &Frame, state: &ExplainState) -> FrameDocument {
        FrameDocument {
            image: self.og_image("Why this product?", &state.description, "", &frame.image),
            buttons: vec![FrameButton {
                label: "Back".to_string(),
                action: ButtonAction::Post,
                target: self.action_url(frame.id),
            }],
            og_title: self.settings.og_title.clone(),
            og_description: state.description.clone(),
            post_url: Some(self.action_url(frame.id)),
            state: None,
        }
    }

    fn product_image(&self, product: &Product) -> String {
        self.og_image(
            &product.title,
            &product.description,
            product.price.as_deref().unwrap_or_default(),
            &product.image,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameshop_config::Fallback;

    fn builder() -> FrameBuilder {
        FrameBuilder::new(FrameSettings {
            base_url: "https://frames.example".to_string(),
            og_title: "Target Onchain".to_string(),
            fallback: Fallback {
                image_url: "https://cdn.example/brand.png".to_string(),
                link_label: "Learn more".to_string(),
                link_target: "https://brand.example".to_string(),
            },
        })
    }

    fn frame() -> Frame {
        Frame {
            id: 9,
            title: "Shoes".to_string(),
            shop: "demo.myshopify.com".to_string(),
            matching_criteria: "ALL".to_string(),
            image: "https://cdn.example/frame.png".to_string(),
            button_label: "Check".to_string(),
        }
    }

    fn product(variant: Option<&str>) -> Product {
        Product {
            id: "p1".to_string(),
            title: "Trail \"Runner\"".to_string(),
            description: "Running shoe".to_string(),
            shop: "demo.myshopify.com".to_string(),
            handle: "trail-runner".to_string(),
            variant_id: variant.map(|v| v.to_string()),
            image: "https://cdn.example/p1.png".to_string(),
            price: Some("$90.00".to_string()),
        }
    }

    #[test]
    fn buy_button_only_with_variant_and_explain_only_in_dev() {
        let b = builder();
        let f = frame();
        let with_variant = product(Some("123"));
        let rec = Recommendation {
            product: &with_variant,
            rule: RuleMatch::NotApplicable,
        };
        let doc = b.recommendation(&f, &rec, Some("why".to_string()));
        let labels: Vec<&str> = doc.buttons.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["View", "Buy", "Explain"]);
        assert_eq!(doc.buttons[0].target, "https://demo.myshopify.com/products/trail-runner");
        assert_eq!(doc.buttons[1].target, "https://demo.myshopify.com/cart/123:1");
        assert_eq!(doc.state.as_ref().map(|s| s.description.as_str()), Some("why"));

        let without_variant = product(None);
        let rec = Recommendation {
            product: &without_variant,
            rule: RuleMatch::NotApplicable,
        };
        let doc = b.recommendation(&f, &rec, None);
        assert_eq!(doc.buttons.len(), 1);
        assert!(doc.state.is_none());
    }

    #[test]
    fn running_match_uses_congrats_image() {
        let p = product(None);
        let rec = Recommendation {
            product: &p,
            rule: RuleMatch::Matched {
                product: &p,
                reason: MatchReason::Running,
            },
        };
        let doc = builder().recommendation(&frame(), &rec, None);
        let url = Url::parse(&doc.image).unwrap();
        let title = url
            .query_pairs()
            .find(|(k, _)| k == "title")
            .map(|(_, v)| v.into_owned());
        assert_eq!(title.as_deref(), Some("Congrats on your +10th run!"));
        assert!(doc.image.starts_with("https://frames.example/api/og?"));
    }

    #[test]
    fn render_escapes_attribute_values() {
        let p = product(None);
        let rec = Recommendation {
            product: &p,
            rule: RuleMatch::NotApplicable,
        };
        let html = builder().recommendation(&frame(), &rec, None).render();
        assert!(html.contains("content=\"Trail &quot;Runner&quot;\""));
        assert!(html.contains("<meta property=\"fc:frame\" content=\"vNext\" />"));
        assert!(html.contains("fc:frame:button:1:action\" content=\"link\""));
    }

    #[test]
    fn landing_posts_to_action_route() {
        let doc = builder().landing(&frame());
        assert_eq!(doc.image, "https://cdn.example/frame.png");
        assert_eq!(doc.buttons[0].label, "Check");
        assert_eq!(doc.buttons[0].action, ButtonAction::Post);
        assert_eq!(doc.buttons[0].target, "https://frames.example/api/frame/9/action");
    }

    #[test]
    fn fallback_links_to_brand() {
        let doc = builder().fallback();
        assert_eq!(doc.buttons.len(), 1);
        assert_eq!(doc.buttons[0].target, "https://brand.example");
        assert!(doc.render().contains("Learn more"));
    }
}
