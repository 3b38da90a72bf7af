use std::{fmt::Write, sync::Arc};

use axum::http::StatusCode;
use serde::Serialize;

use crate::{
    error::AppResult,
    models::{Campground, CampgroundDetails},
    session::{Flash, FlashKind, SessionUser},
};

/// Page
///
/// Every view the application can render, with the data it needs. The serialized tag
/// is the template name (`campgrounds/show`, ...).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "template", content = "context")]
pub enum Page {
    #[serde(rename = "home")]
    Home,
    #[serde(rename = "campgrounds/index")]
    CampgroundIndex { campgrounds: Vec<Campground> },
    #[serde(rename = "campgrounds/new")]
    NewCampground,
    #[serde(rename = "campgrounds/show")]
    ShowCampground { campground: CampgroundDetails },
    #[serde(rename = "campgrounds/edit")]
    EditCampground { campground: Campground },
    #[serde(rename = "users/register")]
    Register,
    #[serde(rename = "users/login")]
    Login,
}

/// View
///
/// A page plus the per-request locals every layout needs.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub page: Page,
    pub current_user: Option<SessionUser>,
    pub flash: Option<Flash>,
}

/// Renderer
///
/// The view collaborator. Handlers only build a [`View`]; turning it into markup is
/// somebody else's job.
pub trait Renderer: Send + Sync {
    fn render(&self, view: &View) -> AppResult<String>;
}

pub type RendererState = Arc<dyn Renderer>;

/// HtmlRenderer
///
/// Plain server-side HTML. Every interpolated value goes through [`escape`].
#[derive(Debug, Default, Clone)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, view: &View) -> AppResult<String> {
        let mut body = String::new();
        write_flash(&mut body, view.flash.as_ref())?;

        match &view.page {
            Page::Home => {
                body.push_str(
                    "<h1>YelpCamp</h1><p>Jump right in and explore our many campgrounds.</p>\
                     <a href=\"/campgrounds\">View Campgrounds</a>",
                );
            }
            Page::CampgroundIndex { campgrounds } => {
                body.push_str("<h1>All Campgrounds</h1><a href=\"/campgrounds/new\">Add Campground</a><ul>");
                for c in campgrounds {
                    write!(
                        body,
                        "<li><img src=\"{}\" alt=\"\"><h5>{}</h5><p>{}</p><small>{}</small>\
                         <a href=\"/campgrounds/{}\">View {}</a></li>",
                        escape(&c.image),
                        escape(&c.title),
                        escape(&c.description),
                        escape(&c.location),
                        c.id,
                        escape(&c.title),
                    )?;
                }
                body.push_str("</ul>");
            }
            Page::NewCampground => {
                body.push_str("<h1>New Campground</h1>");
                write_campground_form(&mut body, "/campgrounds", None)?;
            }
            Page::EditCampground { campground } => {
                body.push_str("<h1>Edit Campground</h1>");
                let action = format!("/campgrounds/{}?_method=PUT", campground.id);
                write_campground_form(&mut body, &action, Some(campground))?;
                write!(body, "<a href=\"/campgrounds/{}\">Back to campground</a>", campground.id)?;
            }
            Page::ShowCampground { campground } => {
                write_show(&mut body, campground, view.current_user.is_some())?;
            }
            Page::Register => {
                body.push_str(
                    "<h1>Register</h1><form action=\"/register\" method=\"POST\">\
                     <label>Username <input type=\"text\" name=\"username\" required></label>\
                     <label>Email <input type=\"email\" name=\"email\" required></label>\
                     <label>Password <input type=\"password\" name=\"password\" required></label>\
                     <button>Register</button></form>",
                );
            }
            Page::Login => {
                body.push_str(
                    "<h1>Login</h1><form action=\"/login\" method=\"POST\">\
                     <label>Username <input type=\"text\" name=\"username\" required></label>\
                     <label>Password <input type=\"password\" name=\"password\" required></label>\
                     <button>Login</button></form>",
                );
            }
        }

        layout(title_of(&view.page), view.current_user.as_ref(), &body)
    }
}

fn title_of(page: &Page) -> &'static str {
    match page {
        Page::Home => "YelpCamp",
        Page::CampgroundIndex { .. } => "All Campgrounds",
        Page::NewCampground => "New Campground",
        Page::ShowCampground { .. } => "Campground",
        Page::EditCampground { .. } => "Edit Campground",
        Page::Register => "Register",
        Page::Login => "Login",
    }
}

fn layout(title: &str, user: Option<&SessionUser>, body: &str) -> AppResult<String> {
    let mut html = String::new();
    write!(
        html,
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{}</title></head><body><nav><a href=\"/\">YelpCamp</a> \
         <a href=\"/campgrounds\">Campgrounds</a> <a href=\"/campgrounds/new\">New Campground</a> ",
        escape(title)
    )?;
    match user {
        Some(u) => write!(
            html,
            "<span>Signed in as {}</span> <a href=\"/logout\">Logout</a>",
            escape(&u.username)
        )?,
        None => html.push_str("<a href=\"/login\">Login</a> <a href=\"/register\">Register</a>"),
    }
    write!(html, "</nav><main>{body}</main></body></html>")?;
    Ok(html)
}

fn write_flash(out: &mut String, flash: Option<&Flash>) -> std::fmt::Result {
    if let Some(flash) = flash {
        let class = match flash.kind {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        };
        write!(
            out,
            "<div class=\"flash flash-{class}\" role=\"alert\">{}</div>",
            escape(&flash.message)
        )?;
    }
    Ok(())
}

fn write_campground_form(out: &mut String, action: &str, current: Option<&Campground>) -> std::fmt::Result {
    let value = |f: fn(&Campground) -> String| current.map(f).unwrap_or_default();
    write!(
        out,
        "<form action=\"{}\" method=\"POST\">\
         <label>Title <input type=\"text\" name=\"campground[title]\" value=\"{}\" required></label>\
         <label>Location <input type=\"text\" name=\"campground[location]\" value=\"{}\" required></label>\
         <label>Image URL <input type=\"text\" name=\"campground[image]\" value=\"{}\" required></label>\
         <label>Price <input type=\"number\" step=\"0.01\" min=\"0\" name=\"campground[price]\" value=\"{}\" required></label>\
         <label>Description <textarea name=\"campground[description]\" required>{}</textarea></label>\
         <button>Save</button></form>",
        escape(action),
        escape(&value(|c| c.title.clone())),
        escape(&value(|c| c.location.clone())),
        escape(&value(|c| c.image.clone())),
        escape(&value(|c| c.price.to_string())),
        escape(&value(|c| c.description.clone())),
    )
}

fn write_show(out: &mut String, details: &CampgroundDetails, signed_in: bool) -> std::fmt::Result {
    let c = &details.campground;
    write!(
        out,
        "<article><img src=\"{}\" alt=\"\"><h1>{}</h1><p>{}</p>\
         <p class=\"location\">{}</p><p class=\"price\">${}/night</p>",
        escape(&c.image),
        escape(&c.title),
        escape(&c.description),
        escape(&c.location),
        c.price,
    )?;
    if signed_in {
        write!(
            out,
            "<a href=\"/campgrounds/{id}/edit\">Edit</a>\
             <form action=\"/campgrounds/{id}?_method=DELETE\" method=\"POST\"><button>Delete</button></form>",
            id = c.id
        )?;
    }
    out.push_str("</article><section class=\"reviews\"><h2>Reviews</h2>");
    if details.reviews.is_empty() {
        out.push_str("<p>No reviews yet.</p>");
    }
    for review in &details.reviews {
        write!(
            out,
            "<div class=\"review\"><h5>Rating: {}</h5><p>{}</p></div>",
            review.rating,
            escape(&review.body)
        )?;
    }
    out.push_str("</section><a href=\"/campgrounds\">All Campgrounds</a>");
    Ok(())
}

/// error_page
///
/// Standalone page used by the central error translation, which has no access to state.
pub fn error_page(status: StatusCode, message: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>Error</title></head>\
         <body><nav><a href=\"/\">YelpCamp</a> <a href=\"/campgrounds\">Campgrounds</a></nav>\
         <main><div class=\"error\" role=\"alert\"><h4>{}</h4><p>{}</p></div></main></body></html>",
        status.as_u16(),
        escape(message)
    )
}

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}
