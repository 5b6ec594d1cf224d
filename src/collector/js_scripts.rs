//! JavaScript evaluated in collector tabs
//!
//! Templates carry `__NAME__` placeholders that [`render`] fills with JSON
//! literals, so every value crossing into the page is properly escaped.

use serde::Serialize;

/// Fill `__NAME__` placeholders with JSON-encoded values
pub fn render(template: &str, values: &[(&str, serde_json::Value)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |script, (name, value)| {
            script.replace(&format!("__{name}__"), &value.to_string())
        })
}

/// JSON-encode anything serializable for [`render`]
pub fn json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Resolves once the module loader global exists
pub const WAIT_FOR_LOADER_SCRIPT: &str = r"
new Promise((resolve, reject) => {
    const started = Date.now();
    const poll = () => {
        if (window.require) {
            resolve(true);
        } else if (Date.now() - started > __TIMEOUT_MS__) {
            reject(new Error('Module loader not available after ' + __TIMEOUT_MS__ + 'ms'));
        } else {
            setTimeout(poll, 100);
        }
    };
    poll();
})
";

/// Resolves once the loader's resolver reports every pending module loaded
pub const WAIT_FOR_RESOLVER_SCRIPT: &str = r"
new Promise((resolve, reject) => {
    const timer = setTimeout(() => reject(new Error('rjsResolver timeout')), __TIMEOUT_MS__);
    require(['rjsResolver'], (resolver) => {
        resolver(() => {
            clearTimeout(timer);
            resolve(true);
        });
    }, (err) => {
        clearTimeout(timer);
        reject(err);
    });
})
";

/// Resolves on the next idle frame, or after a fallback delay
pub const WAIT_FOR_IDLE_SCRIPT: &str = r"
new Promise((resolve) => {
    const timer = setTimeout(resolve, __TIMEOUT_MS__);
    if (typeof requestIdleCallback !== 'undefined') {
        requestIdleCallback(() => {
            clearTimeout(timer);
            resolve(true);
        });
    } else {
        setTimeout(resolve, 2000);
    }
})
";

/// Map of every defined module name to its unbundled, locale-relative path
///
/// A throwaway loader context configured like the default one resolves real
/// file paths even when the storefront already serves bundles.
pub const COLLECT_MODULES_SCRIPT: &str = r"
(function collectDefinedModules(excludedModules, includeMixins) {
    const extractBaseUrl = (loader) =>
        loader.toUrl('').replace(/\/[^/]+\/[^/]+\/[^/]+\/[^/]+\/$/, '/');

    const stripBaseUrl = (baseUrl, moduleUrl) => {
        if (!moduleUrl.startsWith(baseUrl)) {
            return moduleUrl;
        }
        return moduleUrl
            .substring(baseUrl.length)
            .replace(/^[^/]+\/[^/]+\/[^/]+\/[^/]+\//, '');
    };

    const stripPlugin = (name) => name.replace(/^[^!].+!/, '');

    const baseUrl = extractBaseUrl(require);
    const defaultContext = require.s.contexts._;
    const defaultConfig = defaultContext.config;
    const unbundled = require.s.newContext('bundleplan');
    unbundled.configure({
        baseUrl: defaultConfig.baseUrl,
        paths: defaultConfig.paths,
        shim: defaultConfig.shim,
        config: defaultConfig.config,
        map: defaultConfig.map,
    });

    const resolvePath = (name) => stripBaseUrl(baseUrl, unbundled.require.toUrl(stripPlugin(name)));
    const mixins = (defaultConfig.config && defaultConfig.config.mixins) || {};

    const modules = {};
    Object.keys(defaultContext.defined).forEach((name) => {
        if ((name.includes('!') && !name.startsWith('text!')) || /^(https?:)?\/\//.test(name)) {
            return;
        }
        if (excludedModules.includes(name)) {
            return;
        }

        modules[name] = resolvePath(name);

        if (includeMixins && Object.prototype.hasOwnProperty.call(mixins, name)) {
            Object.entries(mixins[name]).forEach(([mixin, enabled]) => {
                if (enabled) {
                    modules[mixin] = resolvePath(mixin);
                }
            });
        }
    });

    return modules;
})(__EXCLUDED__, __INCLUDE_MIXINS__)
";

/// The storefront's own base URL global, or null
pub const BASE_URL_SCRIPT: &str =
    r"(typeof BASE_URL !== 'undefined' && BASE_URL) ? String(BASE_URL) : null";

/// Picks the first available option of every configurable attribute and posts
/// the add-to-cart form in the background
pub const ADD_TO_CART_SCRIPT: &str = r"
(async () => {
    const swatches = document.querySelectorAll('.product-options-wrapper .swatch-attribute');
    Array.from(swatches).forEach((swatch) => {
        const option = swatch.querySelector('.swatch-option:not([disabled])');
        const input = swatch.querySelector('.swatch-input');
        if (option && input) {
            input.value = option.getAttribute('option-id') || option.getAttribute('data-option-id');
        }
    });

    if (!swatches.length) {
        document.querySelectorAll('.product-options-wrapper .super-attribute-select').forEach((select) => {
            const first = Array.from(select.options).find((option) => option.value);
            if (first) {
                select.value = first.value;
                select.dispatchEvent(new Event('input', { bubbles: true }));
                select.dispatchEvent(new Event('change', { bubbles: true }));
            }
        });
    }

    const form = document.querySelector('#product_addtocart_form');
    if (!form) {
        return { submitted: false, status: null };
    }

    const response = await fetch(form.action, {
        method: 'POST',
        body: new FormData(form),
        credentials: 'include',
        headers: { 'X-Requested-With': 'XMLHttpRequest' },
    });
    return { submitted: true, status: response.status };
})()
";
