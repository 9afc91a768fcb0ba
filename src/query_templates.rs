/// A canned question the user can load into the query input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTemplate {
    pub title: &'static str,
    pub question: &'static str,
    pub category: &'static str,
}

const PREVIEW_LEN: usize = 45;

pub const TEMPLATES: &[QueryTemplate] = &[
    QueryTemplate {
        title: "Top Customers",
        question: "Show me the top 10 customers by total order value, including their company name and total spent",
        category: "Sales",
    },
    QueryTemplate {
        title: "Product Performance",
        question: "Which products have the highest sales volume? Show product name, category, and total units sold",
        category: "Products",
    },
    QueryTemplate {
        title: "Regional Sales",
        question: "Break down sales by region and country, showing total revenue and number of orders",
        category: "Analytics",
    },
    QueryTemplate {
        title: "Employee Performance",
        question: "Show employee performance with their total sales, number of orders, and average order value",
        category: "HR",
    },
    QueryTemplate {
        title: "Supplier Analysis",
        question: "List suppliers with their product count, average product price, and total inventory value",
        category: "Supply Chain",
    },
    QueryTemplate {
        title: "Order Trends",
        question: "Show monthly order trends for the last 2 years with total revenue and order count",
        category: "Trends",
    },
];

impl QueryTemplate {
    /// Question shortened for list display
    pub fn preview(&self) -> String {
        if self.question.chars().count() > PREVIEW_LEN {
            let head: String = self.question.chars().take(PREVIEW_LEN).collect();
            format!("{}...", head)
        } else {
            self.question.to_string()
        }
    }
}

pub fn template(index: usize) -> Option<&'static QueryTemplate> {
    TEMPLATES.get(index)
}
